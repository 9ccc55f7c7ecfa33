pub mod registry_entry;
pub mod registry_key_index;
