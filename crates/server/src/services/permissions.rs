use std::sync::Arc;

use propview_api::{ChannelType, ObjectType, PropertyField, PropertyValue, ServiceError};

use crate::host::{HostStore, Permission};

/// Outcome of a permission hook that did not deny.
#[must_use]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    /// The host confirmed the permission.
    Granted,
    /// No policy exists for this check yet; the caller proceeds without one.
    Unchecked,
}

/// Authorizes property mutations against the owning object's channel.
#[derive(Clone)]
pub struct PermissionService {
    host: Arc<dyn HostStore>,
}

impl PermissionService {
    pub fn new(host: Arc<dyn HostStore>) -> Self {
        Self { host }
    }

    /// Check that `user_id` may create or change properties on an object.
    ///
    /// Posts require `create_post` in the post's channel. Channels require the
    /// manage permission for their visibility; direct and group channels are
    /// not supported.
    pub fn can_manage_property(
        &self,
        user_id: &str,
        object_type: ObjectType,
        object_id: &str,
    ) -> Result<Access, ServiceError> {
        match object_type {
            ObjectType::Post => {
                let post = self.host.get_post(object_id)?;
                let channel = self.host.get_channel(&post.channel_id)?;
                self.require(user_id, &channel.id, Permission::CreatePost)
            }
            ObjectType::Channel => {
                let channel = self.host.get_channel(object_id)?;
                let permission = match channel.channel_type {
                    ChannelType::Open => Permission::ManagePublicChannelProperties,
                    ChannelType::Private => Permission::ManagePrivateChannelProperties,
                    ChannelType::Direct | ChannelType::Group => {
                        return Err(ServiceError::NotImplemented(
                            "permission check for dms/gms not implemented".into(),
                        ));
                    }
                };
                self.require(user_id, &channel.id, permission)
            }
        }
    }

    /// Field-level mutation check. No field policy exists yet.
    pub fn can_manage_field(&self, user_id: &str, field_id: Option<&str>) -> Access {
        tracing::debug!(user_id, field_id, "field permission not enforced");
        Access::Unchecked
    }

    /// Value-level check for writing `value` into `field`. No value policy
    /// exists yet; the value itself is still type-checked by the caller.
    pub fn can_set_value(&self, user_id: &str, field: &PropertyField, value: &PropertyValue) -> Access {
        tracing::debug!(
            user_id,
            field_id = %field.id,
            values = value.to_list().len(),
            "value permission not enforced"
        );
        Access::Unchecked
    }

    fn require(
        &self,
        user_id: &str,
        channel_id: &str,
        permission: Permission,
    ) -> Result<Access, ServiceError> {
        if self
            .host
            .has_permission_to_channel(user_id, channel_id, permission)?
        {
            Ok(Access::Granted)
        } else {
            Err(ServiceError::Forbidden(format!(
                "user {user_id} lacks {} in channel {channel_id}",
                permission.as_str()
            )))
        }
    }
}
