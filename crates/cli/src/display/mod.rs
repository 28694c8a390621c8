pub mod summary;

pub use summary::{print_build_results, print_module_list};
