use devloop_core::BuildResult;
use std::path::{Path, PathBuf};

pub fn print_build_results(results: &[BuildResult]) {
    if results.is_empty() {
        println!("No modules found");
        return;
    }

    for result in results {
        if result.is_success() {
            println!("  ✅ {}", result.target);
        } else {
            println!("  ❌ {}: {}", result.target, result.outcome);
        }
    }

    let failed = results.iter().filter(|r| !r.is_success()).count();
    println!(
        "\n📦 {} built, {} failed",
        results.len() - failed,
        failed
    );
}

pub fn print_module_list(modules_root: &Path, modules: &[(&str, PathBuf)]) {
    if modules.is_empty() {
        println!("No modules found in {}", modules_root.display());
        return;
    }

    println!("📦 Modules in {}:", modules_root.display());
    for (name, artifact) in modules {
        println!("  {} -> {}", name, artifact.display());
    }
}
