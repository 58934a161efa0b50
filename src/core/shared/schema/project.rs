diesel::table! {
    projects (id) {
        id -> Uuid,
        name -> Varchar,
        description -> Nullable<Text>,
        company_id -> Nullable<Uuid>,
        manager_id -> Nullable<Uuid>,
        start_date -> Nullable<Date>,
        end_date -> Nullable<Date>,
        budget -> Nullable<Float8>,
        status -> Int2,
        priority -> Int2,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    tasks (id) {
        id -> Uuid,
        title -> Varchar,
        description -> Nullable<Text>,
        project_id -> Nullable<Uuid>,
        assigned_to_id -> Nullable<Uuid>,
        created_by_id -> Nullable<Uuid>,
        due_date -> Nullable<Date>,
        estimated_hours -> Nullable<Float8>,
        status -> Int2,
        priority -> Int2,
        completion_percentage -> Int4,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
    }
}
