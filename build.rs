use std::env;
use std::fmt::Write;
use std::path::PathBuf;

static CONFIGS: &[(&str, usize)] = &[
    // name, default
    ("MAX_FRAME_SLOTS", 4),
    ("COMMAND_QUEUE_SIZE", 4),
];

fn main() {
    let mut data = String::new();

    for (name, default) in CONFIGS {
        let var = format!("TROUBLE_EDDYSTONE_{}", name);
        println!("cargo:rerun-if-env-changed={}", var);

        let value = match env::var(&var) {
            Ok(value) => match value.parse::<usize>() {
                Ok(value) if value > 0 => value,
                _ => panic!("{} must be a positive integer, got {:?}", var, value),
            },
            Err(_) => *default,
        };

        writeln!(&mut data, "pub const {}: usize = {};", name, value).unwrap();
    }

    let out_dir = PathBuf::from(env::var_os("OUT_DIR").unwrap());
    std::fs::write(out_dir.join("config.rs"), data).unwrap();
    println!("cargo:rerun-if-changed=build.rs");
}
