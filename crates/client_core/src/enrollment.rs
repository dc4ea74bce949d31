use shared::protocol::RegisterStudentRequest;

use crate::{device::CaptureFrame, error::ValidationError};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnrollmentForm {
    pub id: String,
    pub name: String,
    pub class_name: String,
    pub email: String,
}

impl EnrollmentForm {
    pub fn validate(&self) -> Result<(), ValidationError> {
        let required = [&self.id, &self.name, &self.class_name, &self.email];
        if required.iter().any(|field| field.trim().is_empty()) {
            return Err(ValidationError::IncompleteEnrollment);
        }
        Ok(())
    }

    pub fn to_request(
        &self,
        photo: Option<&CaptureFrame>,
    ) -> Result<RegisterStudentRequest, ValidationError> {
        self.validate()?;
        Ok(RegisterStudentRequest {
            id: self.id.trim().to_string(),
            name: self.name.trim().to_string(),
            email: self.email.trim().to_string(),
            class_name: self.class_name.trim().to_string(),
            photo_base64: photo.map(CaptureFrame::to_data_url),
        })
    }
}
