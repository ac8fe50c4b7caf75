pub mod memory;
pub mod supabase;

pub use memory::MemoryGateway;
pub use supabase::{SupabaseClient, SupabaseError, SupabaseGateway};
