/// Build script: compiles schema.json with discriminator-codegen so schema
/// authoring errors (a missing tag, a duplicate tag value, ...) fail the
/// build, then stages the schema in OUT_DIR for lib.rs to embed.
fn main() {
    let schema_path = "schema.json";
    println!("cargo:rerun-if-changed={schema_path}");

    let schema_str = std::fs::read_to_string(schema_path).expect("Cannot read schema.json");
    let schema: serde_json::Value =
        serde_json::from_str(&schema_str).expect("Invalid JSON in schema.json");
    discriminator_codegen::compile(&schema)
        .unwrap_or_else(|e| panic!("Invalid schema in schema.json: {e}"));

    let out_dir = std::env::var("OUT_DIR").unwrap();
    let dest = std::path::Path::new(&out_dir).join("schema.json");
    std::fs::write(&dest, schema_str).expect("Cannot write schema.json to OUT_DIR");
}
