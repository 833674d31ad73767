//! Esquema Diesel. Reemplazable con `diesel print-schema`.

diesel::table! {
    workflow_templates (id) {
        id -> Uuid,
        world_id -> Uuid,
        name -> Text,
        is_active -> Bool,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    workflow_steps (id) {
        id -> Uuid,
        workflow_template_id -> Uuid,
        step_number -> Int4,
        name -> Text,
        description -> Nullable<Text>,
        step_type -> Text,
        requires_decision -> Bool,
        form_fields -> Jsonb,
        next_step_id -> Nullable<Uuid>,
        decision_yes_next_step_id -> Nullable<Uuid>,
        decision_no_next_step_id -> Nullable<Uuid>,
        parallel_steps -> Array<Uuid>,
        can_loop_back -> Bool,
    }
}

diesel::table! {
    dossiers (id) {
        id -> Uuid,
        world_id -> Uuid,
        title -> Text,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    dossier_workflow_progress (id) {
        id -> Uuid,
        dossier_id -> Uuid,
        workflow_step_id -> Uuid,
        status -> Text,
        started_at -> Nullable<Timestamptz>,
        completed_at -> Nullable<Timestamptz>,
        completed_by -> Nullable<Uuid>,
        decision_taken -> Nullable<Bool>,
        notes -> Nullable<Text>,
        form_data -> Nullable<Jsonb>,
    }
}

diesel::table! {
    dossier_comments (id) {
        id -> Uuid,
        seq -> BigInt,
        dossier_id -> Uuid,
        author_id -> Uuid,
        content -> Text,
        comment_type -> Text,
        workflow_step_id -> Nullable<Uuid>,
        payload -> Nullable<Jsonb>,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    dossier_attachments (id) {
        id -> Uuid,
        dossier_id -> Uuid,
        file_name -> Text,
        description -> Nullable<Text>,
        uploaded_by -> Nullable<Uuid>,
        workflow_step_id -> Nullable<Uuid>,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    tasks (id) {
        id -> Uuid,
        dossier_id -> Nullable<Uuid>,
        title -> Text,
        description -> Nullable<Text>,
        status -> Text,
        created_by -> Nullable<Uuid>,
        assigned_to -> Nullable<Uuid>,
        workflow_step_id -> Nullable<Uuid>,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    appointments (id) {
        id -> Uuid,
        dossier_id -> Uuid,
        title -> Text,
        description -> Nullable<Text>,
        status -> Text,
        start_time -> Timestamptz,
        created_by -> Nullable<Uuid>,
        workflow_step_id -> Nullable<Uuid>,
    }
}

diesel::table! {
    dossier_step_annotations (id) {
        id -> Uuid,
        dossier_id -> Uuid,
        workflow_step_id -> Uuid,
        content -> Text,
        created_by -> Nullable<Uuid>,
        created_at -> Timestamptz,
    }
}

diesel::joinable!(workflow_steps -> workflow_templates (workflow_template_id));
diesel::joinable!(dossier_workflow_progress -> dossiers (dossier_id));
diesel::joinable!(dossier_workflow_progress -> workflow_steps (workflow_step_id));
diesel::joinable!(dossier_comments -> dossiers (dossier_id));

diesel::allow_tables_to_appear_in_same_query!(
    workflow_templates,
    workflow_steps,
    dossiers,
    dossier_workflow_progress,
    dossier_comments,
    dossier_attachments,
    tasks,
    appointments,
    dossier_step_annotations,
);
