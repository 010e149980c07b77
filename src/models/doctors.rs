use crate::schema::doctors;
use chrono::NaiveDateTime;

#[derive(Queryable)]
pub struct DoctorData {
    pub id: u64,
    pub user_id: Option<u64>,
    pub name: String,
    pub specialty: String,
    pub telephone: String,
    pub deleted_at: Option<NaiveDateTime>,
}

#[derive(Insertable)]
#[table_name = "doctors"]
pub struct NewDoctor {
    pub user_id: Option<u64>,
    pub name: String,
    pub specialty: String,
    pub telephone: String,
}

#[derive(AsChangeset, Default)]
#[table_name = "doctors"]
pub struct UpdateDoctor {
    /// `Some(None)` clears the link.
    pub user_id: Option<Option<u64>>,
    pub name: Option<String>,
    pub specialty: Option<String>,
    pub telephone: Option<String>,
}

impl UpdateDoctor {
    pub fn is_empty(&self) -> bool {
        self.user_id.is_none()
            && self.name.is_none()
            && self.specialty.is_none()
            && self.telephone.is_none()
    }
}
