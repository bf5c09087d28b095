//! Application services. Each is constructed once at start-up and shared
//! through `AppState`.

pub mod fields;
pub mod permissions;
pub mod properties;
pub mod views;

pub use fields::FieldService;
pub use permissions::{Access, PermissionService};
pub use properties::PropertyService;
pub use views::ViewService;
