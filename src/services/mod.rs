pub mod profiles;
pub mod scan_history;
mod supabase;

pub use supabase::*;
