pub mod directory;
pub mod supabase;
pub mod working_hours;

pub use directory::{InMemoryProviderDirectory, ProviderDirectory};
pub use supabase::SupabaseProviderDirectory;
pub use working_hours::{WorkingHoursService, WorkingHoursSource};
