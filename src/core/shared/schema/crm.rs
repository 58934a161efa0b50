diesel::table! {
    companies (id) {
        id -> Uuid,
        name -> Varchar,
        industry -> Nullable<Varchar>,
        size -> Nullable<Varchar>,
        website -> Nullable<Varchar>,
        phone -> Nullable<Varchar>,
        email -> Nullable<Varchar>,
        address -> Nullable<Text>,
        city -> Nullable<Varchar>,
        country -> Nullable<Varchar>,
        annual_revenue -> Nullable<Float8>,
        employee_count -> Nullable<Int4>,
        description -> Nullable<Text>,
        is_active -> Bool,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    contacts (id) {
        id -> Uuid,
        company_id -> Nullable<Uuid>,
        first_name -> Varchar,
        last_name -> Varchar,
        email -> Nullable<Varchar>,
        phone -> Nullable<Varchar>,
        mobile -> Nullable<Varchar>,
        job_title -> Nullable<Varchar>,
        is_primary -> Bool,
        is_active -> Bool,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    leads (id) {
        id -> Uuid,
        title -> Varchar,
        company_id -> Nullable<Uuid>,
        contact_id -> Nullable<Uuid>,
        source -> Nullable<Varchar>,
        status -> Int2,
        estimated_value -> Nullable<Float8>,
        probability -> Int4,
        expected_close_date -> Nullable<Date>,
        assigned_to_id -> Nullable<Uuid>,
        created_by_id -> Nullable<Uuid>,
        description -> Nullable<Text>,
        notes -> Nullable<Text>,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    deals (id) {
        id -> Uuid,
        title -> Varchar,
        company_id -> Nullable<Uuid>,
        contact_id -> Nullable<Uuid>,
        lead_id -> Nullable<Uuid>,
        stage -> Int2,
        value -> Float8,
        probability -> Int4,
        expected_close_date -> Nullable<Date>,
        actual_close_date -> Nullable<Date>,
        owner_id -> Nullable<Uuid>,
        description -> Nullable<Text>,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    activities (id) {
        id -> Uuid,
        activity_type -> Int2,
        subject -> Varchar,
        description -> Nullable<Text>,
        lead_id -> Nullable<Uuid>,
        deal_id -> Nullable<Uuid>,
        contact_id -> Nullable<Uuid>,
        scheduled_at -> Nullable<Timestamptz>,
        duration_minutes -> Nullable<Int4>,
        is_completed -> Bool,
        assigned_to_id -> Nullable<Uuid>,
        created_by_id -> Nullable<Uuid>,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
    }
}
