use serde::{Deserialize, Serialize};

/// The student-facing attendance form, ready to be posted back.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct AttendanceForm {
    pub action: String,
    /// Hidden inputs plus the chosen `status` radio, in document order.
    pub fields: Vec<(String, String)>,
}

impl AttendanceForm {
    pub fn with_password(&self, password: &str) -> Vec<(String, String)> {
        let mut fields = self.fields.clone();
        fields.push(("studentpassword".to_string(), password.to_string()));
        fields
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttendanceStatus {
    /// The page still offers a submit link.
    Pending,
    /// Today's session row already carries an attended status.
    Marked,
    Unknown,
}
