//! Diesel schema for human-task persistence.

diesel::table! {
    /// Human-task records; `record` holds the full flat task record.
    human_tasks (id) {
        /// Task identifier.
        id -> Uuid,
        /// Conditional-update token.
        revision -> Int8,
        /// Lifecycle status, duplicated from `record` for indexing.
        #[max_length = 50]
        status -> Varchar,
        /// Owning process instance, if any.
        #[max_length = 255]
        process_id -> Nullable<Varchar>,
        /// Spawning node definition, if any.
        #[max_length = 255]
        task_def_id -> Nullable<Varchar>,
        /// Flat task record.
        record -> Jsonb,
        /// Creation timestamp.
        created_at -> Timestamptz,
        /// Last update timestamp.
        updated_at -> Timestamptz,
    }
}
