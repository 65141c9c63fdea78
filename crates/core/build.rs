//! Builds the SLR table from `syntax/syntax.txt` and writes it to
//! `$OUT_DIR/syntax-table.txt`. A conflicting grammar fails the build.

use std::path::Path;

#[path = "src/grammar/definition.rs"]
#[allow(dead_code)]
mod definition;

#[path = "src/grammar/table.rs"]
#[allow(dead_code)]
mod table;

#[path = "src/grammar/builder.rs"]
#[allow(dead_code)]
mod builder;

// builder.rs reaches its siblings through `super::`.
use builder::build;

fn main() {
    println!("cargo:rerun-if-changed=syntax/syntax.txt");
    println!("cargo:rerun-if-changed=src/grammar/definition.rs");
    println!("cargo:rerun-if-changed=src/grammar/table.rs");
    println!("cargo:rerun-if-changed=src/grammar/builder.rs");

    let text = std::fs::read_to_string("syntax/syntax.txt")
        .unwrap_or_else(|e| panic!("cannot read syntax/syntax.txt: {e}"));
    let expressions = definition::parse_definition(&text)
        .unwrap_or_else(|e| panic!("syntax/syntax.txt: {e}"));
    let table = match build(&expressions) {
        Ok(table) => table,
        Err(builder::BuildError::Conflicts(conflicts)) => {
            for c in &conflicts {
                println!("cargo:warning={c}");
            }
            panic!("grammar is not SLR(1): {} conflict(s)", conflicts.len());
        }
        Err(e) => panic!("{e}"),
    };

    let out_dir = std::env::var("OUT_DIR").unwrap_or_else(|e| panic!("OUT_DIR: {e}"));
    let path = Path::new(&out_dir).join("syntax-table.txt");
    std::fs::write(&path, table.to_text())
        .unwrap_or_else(|e| panic!("cannot write {}: {e}", path.display()));
}
