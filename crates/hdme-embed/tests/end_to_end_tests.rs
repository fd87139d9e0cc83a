//! End-to-end integration tests for the complete extension build pipeline
//!
//! Builds a miniature hdme library tree on disk and runs collection,
//! embedding, patching and descriptor assembly against it.

use hdme_embed::{
    BuildConfig, Collector, EmbeddedTable, ExtensionDescriptor, Patcher, UnitKind,
};
use std::fs;
use std::path::{Path, PathBuf};

const LOADER: &str = "\
#include <stdio.h>
#include \"hdme_data.h\"

int
hdme_data_read(char* str, const char* name)
{
    char filename[512];
    FILE* file;
    int success;

    sprintf(filename, \"%s/%s\", HDME_DATA_DIR, name);
    file = fopen(filename, \"r\");
    success = (file != NULL) && (fscanf(file, \"%s\", str) == 1);
    if (file != NULL)
    {
        fclose(file);
    }
    return success;
}
";

fn create_library_tree(root: &Path, config: &BuildConfig) {
    let lib = config.lib_path(root);
    fs::create_dir_all(lib.join("hdme_data")).unwrap();
    fs::create_dir_all(lib.join("siegel")).unwrap();
    fs::create_dir_all(lib.join("test")).unwrap();

    fs::write(config.loader_path(root), LOADER).unwrap();
    fs::write(lib.join("siegel/modeq.c"), "int modeq(void);\n").unwrap();
    fs::write(lib.join("igusa.c"), "int igusa(void);\n").unwrap();
    fs::write(lib.join("test/t-modeq.c"), "int main(void);\n").unwrap();
    fs::create_dir_all(lib.join("hdme_data/sub")).unwrap();
    fs::write(lib.join("hdme_data/j2_coeffs"), "1 2 3").unwrap();
    fs::write(lib.join("hdme_data/sub/j4_coeffs"), "4 5 6").unwrap();
}

fn run_pipeline(root: &Path, config: &BuildConfig) -> ExtensionDescriptor {
    let tree = Collector::new(config, root).collect().unwrap();
    let table = EmbeddedTable::from_files(&config.data_path(root), &tree.resources).unwrap();
    let patcher = Patcher::new(config, root);
    let guard = patcher.apply_scoped(&table).unwrap();
    let descriptor = ExtensionDescriptor::assemble(config, &tree);
    guard.persist();
    descriptor
}

#[test]
fn test_full_pipeline_produces_patched_unit_set() {
    let temp = tempfile::tempdir().unwrap();
    let config = BuildConfig::default();
    create_library_tree(temp.path(), &config);

    let descriptor = run_pipeline(temp.path(), &config);
    let patcher = Patcher::new(&config, temp.path());

    // Unit-set exclusivity: the patched unit replaces the loader
    let paths: Vec<&Path> = descriptor.sources.iter().map(|u| u.path.as_path()).collect();
    assert!(paths.contains(&Path::new("lib/hdme_data/hdme_data_inline.c")));
    assert!(!paths.contains(&Path::new("lib/hdme_data/hdme_data_read.c")));
    assert_eq!(
        descriptor
            .sources
            .iter()
            .filter(|u| u.kind == UnitKind::Generated)
            .count(),
        1
    );

    // The generated unit really exists and embeds both resources
    let generated = fs::read_to_string(patcher.generated_path()).unwrap();
    assert!(generated.contains("\"j2_coeffs\","));
    assert!(generated.contains("\"sub/j4_coeffs\","));
    assert!(generated.contains("success = hdme_data_inline_lookup(str, name);"));

    assert!(patcher.undo().unwrap());
}

#[test]
fn test_pipeline_cleanup_restores_tree() {
    let temp = tempfile::tempdir().unwrap();
    let config = BuildConfig::default();
    create_library_tree(temp.path(), &config);

    let tree = Collector::new(&config, temp.path()).collect().unwrap();
    let table =
        EmbeddedTable::from_files(&config.data_path(temp.path()), &tree.resources).unwrap();
    let patcher = Patcher::new(&config, temp.path());

    {
        let _guard = patcher.apply_scoped(&table).unwrap();
        assert!(patcher.is_applied());
        assert!(!patcher.loader_path().exists());
    }

    // Guard drop is the guaranteed release: loader back, artifacts gone
    assert!(!patcher.is_applied());
    assert_eq!(fs::read_to_string(patcher.loader_path()).unwrap(), LOADER);
    assert!(!patcher.generated_path().exists());
    assert!(!patcher.backup_path().exists());
}

#[test]
fn test_cleanup_runs_when_descriptor_write_fails() {
    let temp = tempfile::tempdir().unwrap();
    let config = BuildConfig::default();
    create_library_tree(temp.path(), &config);

    let tree = Collector::new(&config, temp.path()).collect().unwrap();
    let table =
        EmbeddedTable::from_files(&config.data_path(temp.path()), &tree.resources).unwrap();
    let patcher = Patcher::new(&config, temp.path());

    let result: Result<(), hdme_embed::ExtensionError> = (|| {
        let _guard = patcher.apply_scoped(&table).unwrap();
        let descriptor = ExtensionDescriptor::assemble(&config, &tree);
        // Writing under a missing directory fails after the patch is applied
        descriptor.write_json(&temp.path().join("no/such/dir/extension.json"))?;
        Ok(())
    })();

    assert!(result.is_err());
    assert_eq!(fs::read_to_string(patcher.loader_path()).unwrap(), LOADER);
    assert!(!patcher.generated_path().exists());
}

#[test]
fn test_recollect_while_patched_is_stable() {
    let temp = tempfile::tempdir().unwrap();
    let config = BuildConfig::default();
    create_library_tree(temp.path(), &config);

    let descriptor_before = run_pipeline(temp.path(), &config);

    // A second collection sees the generated unit instead of the loader,
    // yet assembles the same unit set
    let tree = Collector::new(&config, temp.path()).collect().unwrap();
    assert!(tree
        .sources
        .contains(&PathBuf::from("hdme_data/hdme_data_inline.c")));
    assert!(!tree
        .sources
        .contains(&PathBuf::from("hdme_data/hdme_data_read.c")));
    let descriptor_after = ExtensionDescriptor::assemble(&config, &tree);
    assert_eq!(descriptor_before.sources, descriptor_after.sources);

    let patcher = Patcher::new(&config, temp.path());
    assert!(patcher.undo().unwrap());
}

#[test]
fn test_descriptor_json_written() {
    let temp = tempfile::tempdir().unwrap();
    let config = BuildConfig::default();
    create_library_tree(temp.path(), &config);

    let descriptor = run_pipeline(temp.path(), &config);
    let out = temp.path().join("extension.json");
    descriptor.write_json(&out).unwrap();

    let text = fs::read_to_string(&out).unwrap();
    let parsed: ExtensionDescriptor = serde_json::from_str(&text).unwrap();
    assert_eq!(parsed, descriptor);
    assert_eq!(parsed.name, "hdme");
    assert_eq!(
        parsed.libraries,
        vec!["arb", "flint", "mpfr", "gmp", "pthread", "m"]
    );

    Patcher::new(&config, temp.path()).undo().unwrap();
}
