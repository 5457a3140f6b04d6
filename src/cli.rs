//! Minimal CLI: schema YAML in, validator header/implementation out.
use std::fs::File;
use std::io::Write as _;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;

use crate::compile::compile_schema;
use crate::diag::Diagnostics;
use crate::node::Document;

// ————————————————————————————————————————————————————————————————————————————
// TYPES
// ————————————————————————————————————————————————————————————————————————————

/// Generate a C++ validator class from a YAML schema document.
#[derive(Parser, Debug)]
#[command(name = "yamlschema-gen", version)]
pub struct CommandLineInterface {
    /// input schema YAML document
    pub schema: PathBuf,

    /// header output path (defaults to the --src path with extension `.h`, or `<class>.h`)
    #[arg(long)]
    pub hdr: Option<PathBuf>,

    /// implementation output path (defaults to the --hdr path with extension `.cc`, or `<class>.cc`)
    #[arg(long)]
    pub src: Option<PathBuf>,

    /// name of the generated validator class
    #[arg(long, default_value = "Schema")]
    pub class: String,
}

// ————————————————————————————————————————————————————————————————————————————
// IMPLEMENTATION
// ————————————————————————————————————————————————————————————————————————————

/// Parse the command line and run one compilation. Diagnostics go to stdout
/// one per line; the exit code is zero iff nothing of severity ERROR was
/// recorded.
pub fn run() -> ExitCode {
    let (args, notes) = filter_unknown_options(std::env::args().collect());
    let cli = match CommandLineInterface::try_parse_from(args) {
        Ok(cli) => cli,
        Err(err)
            if matches!(
                err.kind(),
                clap::error::ErrorKind::DisplayHelp | clap::error::ErrorKind::DisplayVersion
            ) =>
        {
            let _ = err.print();
            return ExitCode::SUCCESS;
        }
        Err(err) => {
            let mut notes = notes;
            let text = err.to_string();
            notes.error(text.lines().next().unwrap_or("invalid arguments").to_string());
            return report(notes);
        }
    };
    report(cli.execute(notes))
}

fn report(notes: Diagnostics) -> ExitCode {
    for note in notes.iter() {
        println!("{}: {}", note.severity, note.text);
    }
    if notes.is_ok() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

impl CommandLineInterface {
    /// One full run: resolve output paths, load and parse the schema, open
    /// both outputs (truncating), compile, write the generated text.
    pub fn execute(&self, mut notes: Diagnostics) -> Diagnostics {
        let (hdr_path, src_path) = match self.output_paths() {
            Ok(paths) => paths,
            Err(err) => {
                notes.note(err);
                return notes;
            }
        };

        let content = match std::fs::read_to_string(&self.schema) {
            Ok(content) => content,
            Err(err) => {
                notes.error(format!(
                    "Failed to read schema file '{}': {}",
                    self.schema.display(),
                    err
                ));
                return notes;
            }
        };
        notes.info(format!(
            "Loaded schema file '{}' - {} bytes",
            self.schema.display(),
            content.len()
        ));

        let doc = match Document::parse(&content) {
            Ok(doc) => doc,
            Err(err) => {
                notes.error(format!("Loading failed: {}", err));
                return notes;
            }
        };

        // Both outputs must be writable before any emission happens.
        let mut hdr_file = match File::create(&hdr_path) {
            Ok(file) => file,
            Err(err) => {
                notes.error(format!(
                    "Failed to open header output file '{}': {}",
                    hdr_path.display(),
                    err
                ));
                return notes;
            }
        };
        let mut src_file = match File::create(&src_path) {
            Ok(file) => file,
            Err(err) => {
                notes.error(format!(
                    "Failed to open source output file '{}': {}",
                    src_path.display(),
                    err
                ));
                return notes;
            }
        };

        tracing::debug!(
            hdr = %hdr_path.display(),
            src = %src_path.display(),
            class = %self.class,
            "generating validator"
        );
        let output = compile_schema(&doc, &self.class, &hdr_path.to_string_lossy());
        notes.note(output.notes);

        if let Err(err) = hdr_file
            .write_all(output.hdr.as_bytes())
            .and_then(|()| hdr_file.flush())
        {
            notes.error(format!(
                "Failed writing header output file '{}': {}",
                hdr_path.display(),
                err
            ));
            return notes;
        }
        if let Err(err) = src_file
            .write_all(output.src.as_bytes())
            .and_then(|()| src_file.flush())
        {
            notes.error(format!(
                "Failed writing source output file '{}': {}",
                src_path.display(),
                err
            ));
        }
        notes
    }

    /// Defaulting chain: a missing header path derives from --src (extension
    /// `.h`) or from the class name; the implementation path then derives
    /// from the header path (extension `.cc`).
    fn output_paths(&self) -> Result<(PathBuf, PathBuf), Diagnostics> {
        let hdr = match &self.hdr {
            Some(path) => path.clone(),
            None => {
                if let Some(src) = &self.src {
                    src.with_extension("h")
                } else if !self.class.is_empty() {
                    PathBuf::from(format!("{}.h", self.class))
                } else {
                    let mut erratum = Diagnostics::new();
                    erratum.error("Unable to determine path for output header file.");
                    return Err(erratum);
                }
            }
        };
        let src = match &self.src {
            Some(path) => path.clone(),
            None => hdr.with_extension("cc"),
        };
        Ok((hdr, src))
    }
}

// ————————————————————————————————————————————————————————————————————————————
// INTERNAL HELPERS
// ————————————————————————————————————————————————————————————————————————————

/// Drop `-x`-shaped tokens before clap sees them: unknown short options are
/// warned about and ignored rather than rejected. Long options pass through.
fn filter_unknown_options(args: Vec<String>) -> (Vec<String>, Diagnostics) {
    let mut notes = Diagnostics::new();
    let mut kept = Vec::with_capacity(args.len());
    for (idx, arg) in args.into_iter().enumerate() {
        let short_option = idx > 0 && arg.len() > 1 && arg.starts_with('-') && !arg.starts_with("--");
        if short_option {
            notes.warn(format!("Unknown option '{}' - ignored", arg));
        } else {
            kept.push(arg);
        }
    }
    (kept, notes)
}
