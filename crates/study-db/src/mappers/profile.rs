//! Profile entity <-> model mapper

use study_core::entities::Profile;
use study_core::value_objects::RecordId;

use crate::models::ProfileModel;

impl From<ProfileModel> for Profile {
    fn from(model: ProfileModel) -> Self {
        Profile {
            id: RecordId::from(model.id),
            display_name: model.display_name,
            email: model.email,
            avatar_url: model.avatar_url,
        }
    }
}
