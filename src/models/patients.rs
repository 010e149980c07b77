use crate::schema::patients;
use chrono::{NaiveDate, NaiveDateTime};

#[derive(Queryable)]
pub struct PatientData {
    pub id: u64,
    pub name: String,
    pub gender: String,
    pub birthday: Option<NaiveDate>,
    pub telephone: String,
    pub email: String,
    pub notes: String,
    pub created_at: NaiveDateTime,
    pub deleted_at: Option<NaiveDateTime>,
}

#[derive(Insertable)]
#[table_name = "patients"]
pub struct NewPatient {
    pub name: String,
    pub gender: String,
    pub birthday: Option<NaiveDate>,
    pub telephone: String,
    pub email: String,
    pub notes: String,
    pub created_at: NaiveDateTime,
}

#[derive(AsChangeset, Default)]
#[table_name = "patients"]
pub struct UpdatePatient {
    pub name: Option<String>,
    pub gender: Option<String>,
    pub birthday: Option<NaiveDate>,
    pub telephone: Option<String>,
    pub email: Option<String>,
    pub notes: Option<String>,
}

impl UpdatePatient {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.gender.is_none()
            && self.birthday.is_none()
            && self.telephone.is_none()
            && self.email.is_none()
            && self.notes.is_none()
    }
}
