//! Diesel table definitions for the logistics schema.
//!
//! These definitions must match `migrations/` exactly. Regenerate with
//! `diesel print-schema` after changing a migration.

diesel::table! {
    /// Role lookup table seeded by the initial migration.
    roles (role_pk) {
        role_pk -> Int4,
        rolename -> Varchar,
    }
}

diesel::table! {
    /// User accounts with Argon2id PHC password strings.
    users (user_pk) {
        user_pk -> Int4,
        username -> Varchar,
        password -> Varchar,
        role_fk -> Int4,
    }
}

diesel::table! {
    facilities (facility_pk) {
        facility_pk -> Int4,
        /// Short unique facility code.
        fcode -> Varchar,
        common_name -> Varchar,
        location -> Varchar,
    }
}

diesel::table! {
    assets (asset_pk) {
        asset_pk -> Int4,
        asset_tag -> Varchar,
        description -> Varchar,
        disposed -> Bool,
    }
}

diesel::table! {
    /// Location history. A null `depart_dt` marks the current row; a partial
    /// unique index allows at most one such row per asset.
    asset_at (asset_at_pk) {
        asset_at_pk -> Int4,
        asset_fk -> Int4,
        facility_fk -> Int4,
        arrive_dt -> Date,
        depart_dt -> Nullable<Date>,
    }
}

diesel::table! {
    /// Transfer requests.
    requests (request_pk) {
        request_pk -> Int4,
        asset_fk -> Int4,
        user_fk -> Int4,
        src_fk -> Int4,
        dest_fk -> Int4,
        request_dt -> Timestamptz,
        approved -> Bool,
        approving_user_fk -> Nullable<Int4>,
        approve_dt -> Nullable<Timestamptz>,
        completed -> Bool,
    }
}

diesel::table! {
    /// Transit record created on approval, one per request.
    in_transit (request_fk) {
        request_fk -> Int4,
        load_dt -> Nullable<Date>,
        unload_dt -> Nullable<Date>,
    }
}

diesel::joinable!(users -> roles (role_fk));
diesel::joinable!(asset_at -> assets (asset_fk));
diesel::joinable!(asset_at -> facilities (facility_fk));
diesel::joinable!(requests -> assets (asset_fk));
diesel::joinable!(in_transit -> requests (request_fk));

diesel::allow_tables_to_appear_in_same_query!(
    roles, users, facilities, assets, asset_at, requests, in_transit,
);
