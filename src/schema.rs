table! {
    appointments (id) {
        id -> Unsigned<Bigint>,
        patient_id -> Unsigned<Bigint>,
        doctor_id -> Unsigned<Bigint>,
        start_time -> Datetime,
        end_time -> Datetime,
        status -> Varchar,
        reason -> Varchar,
        notes -> Varchar,
        created_by -> Unsigned<Bigint>,
        created_at -> Datetime,
        updated_at -> Datetime,
        deleted_at -> Nullable<Datetime>,
    }
}

table! {
    doctors (id) {
        id -> Unsigned<Bigint>,
        user_id -> Nullable<Unsigned<Bigint>>,
        name -> Varchar,
        specialty -> Varchar,
        telephone -> Varchar,
        deleted_at -> Nullable<Datetime>,
    }
}

table! {
    patients (id) {
        id -> Unsigned<Bigint>,
        name -> Varchar,
        gender -> Varchar,
        birthday -> Nullable<Date>,
        telephone -> Varchar,
        email -> Varchar,
        notes -> Varchar,
        created_at -> Datetime,
        deleted_at -> Nullable<Datetime>,
    }
}

table! {
    reminders (appointment_id) {
        appointment_id -> Unsigned<Bigint>,
        scheduled_at -> Datetime,
        status -> Varchar,
        attempts -> Integer,
        last_error -> Nullable<Varchar>,
        next_retry_at -> Nullable<Datetime>,
        sent_at -> Nullable<Datetime>,
        updated_at -> Datetime,
    }
}

table! {
    users (id) {
        id -> Unsigned<Bigint>,
        email -> Varchar,
        password -> Char,
        name -> Varchar,
        role -> Varchar,
        is_active -> Bool,
        created_at -> Datetime,
    }
}

joinable!(appointments -> doctors (doctor_id));
joinable!(appointments -> patients (patient_id));
joinable!(reminders -> appointments (appointment_id));

allow_tables_to_appear_in_same_query!(
    appointments,
    doctors,
    patients,
    reminders,
    users,
);
