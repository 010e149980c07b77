pub mod appointments;
pub mod doctors;
pub mod patients;
pub mod reminders;
pub mod users;
