diesel::table! {
    departments (id) {
        id -> Uuid,
        name -> Varchar,
        description -> Nullable<Text>,
        manager_id -> Nullable<Uuid>,
        is_active -> Bool,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    employees (id) {
        id -> Uuid,
        employee_code -> Varchar,
        first_name -> Varchar,
        last_name -> Varchar,
        email -> Nullable<Varchar>,
        phone -> Nullable<Varchar>,
        user_id -> Nullable<Uuid>,
        department_id -> Nullable<Uuid>,
        designation_id -> Nullable<Uuid>,
        manager_id -> Nullable<Uuid>,
        job_title -> Nullable<Varchar>,
        hire_date -> Date,
        employment_type -> Nullable<Varchar>,
        status -> Int2,
        salary -> Nullable<Float8>,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    designations (id) {
        id -> Uuid,
        title -> Varchar,
        department_id -> Nullable<Uuid>,
        level -> Nullable<Int4>,
        description -> Nullable<Text>,
        is_active -> Bool,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    leave_types (id) {
        id -> Uuid,
        name -> Varchar,
        description -> Nullable<Text>,
        max_days_per_year -> Nullable<Int4>,
        is_paid -> Bool,
        requires_approval -> Bool,
        is_active -> Bool,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    leave_requests (id) {
        id -> Uuid,
        employee_id -> Uuid,
        leave_type_id -> Uuid,
        start_date -> Date,
        end_date -> Date,
        days_requested -> Int4,
        reason -> Nullable<Text>,
        status -> Int2,
        approved_by_id -> Nullable<Uuid>,
        approval_date -> Nullable<Timestamptz>,
        approval_comments -> Nullable<Text>,
        created_by_id -> Nullable<Uuid>,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
    }
}
