use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

use classabi::AbiConfig;

/// classabi - strip JVM class files and jars down to their public API
#[derive(Debug, Parser)]
#[command(name = "classabi", version, about, long_about = None)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOptions,

    #[command(subcommand)]
    pub command: Command,
}

/// Options shared across all subcommands.
#[derive(Debug, Parser)]
pub struct GlobalOptions {
    /// Emit output as JSON instead of human-readable text.
    #[arg(long, global = true)]
    pub json: bool,

    /// Enable verbose (debug-level) logging output.
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Strip one jar into an ABI jar.
    Strip {
        /// Input jar.
        #[arg(value_name = "INPUT")]
        input: PathBuf,

        /// Output jar; replaced atomically once stripping succeeded.
        #[arg(short, long, value_name = "OUTPUT")]
        output: PathBuf,

        #[command(flatten)]
        config: ConfigArgs,
    },

    /// Strip several jars in parallel.
    Batch {
        /// Jobs as INPUT=OUTPUT pairs.
        #[arg(value_name = "INPUT=OUTPUT", required = true, value_parser = parse_job)]
        jobs: Vec<(PathBuf, PathBuf)>,

        #[command(flatten)]
        config: ConfigArgs,
    },

    /// Print the header, members and Kotlin metadata of a class file.
    Inspect {
        /// A class file, or a jar when --entry is given.
        #[arg(value_name = "FILE")]
        path: PathBuf,

        /// Entry inside the jar, e.g. com/x/A.class.
        #[arg(long, value_name = "NAME")]
        entry: Option<String>,
    },
}

/// Starting point for the stripping switches.
#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub enum Preset {
    /// Metadata-aware filter, internal members kept
    #[default]
    Default,
    /// Access flags only
    Java,
    /// Metadata-aware filter, internal members treated as private
    Kotlin,
    /// Kotlin plus method bodies kept for inline functions
    InlineSafe,
}

/// Switches mapping one-to-one onto [`AbiConfig`].
#[derive(Debug, Args)]
pub struct ConfigArgs {
    /// Preset the individual switches start from.
    #[arg(long, value_enum, default_value_t = Preset::Default)]
    pub preset: Preset,

    /// Ignore @kotlin.Metadata and filter on access flags only.
    #[arg(long)]
    pub no_metadata: bool,

    /// Treat Kotlin `internal` declarations as private.
    #[arg(long)]
    pub treat_internal_as_private: bool,

    /// Keep metadata declarations in their original order.
    #[arg(long)]
    pub preserve_declaration_order: bool,

    /// Remove every constructor, function, property and type alias from the metadata.
    #[arg(long)]
    pub prune_class: bool,

    /// Keep methods with code and replace non-inline bodies by a stub.
    #[arg(long)]
    pub body_stripping: bool,

    /// Keep private methods.
    #[arg(long)]
    pub keep_private_methods: bool,

    /// Keep SourceFile and SourceDebugExtension.
    #[arg(long)]
    pub keep_source_debug_info: bool,

    /// Do not copy META-INF/*.kotlin_module.
    #[arg(long)]
    pub no_kotlin_module: bool,
}

impl ConfigArgs {
    /// Applies the switches on top of the selected preset.
    pub fn to_config(&self) -> AbiConfig {
        let mut config = match self.preset {
            Preset::Default => AbiConfig::default(),
            Preset::Java => AbiConfig::java(),
            Preset::Kotlin => AbiConfig::kotlin(),
            Preset::InlineSafe => AbiConfig::inline_safe(),
        };

        config.use_metadata &= !self.no_metadata;
        config.treat_internal_as_private |= self.treat_internal_as_private;
        config.preserve_declaration_order |= self.preserve_declaration_order;
        config.prune_class |= self.prune_class;
        config.body_stripping |= self.body_stripping;
        config.method_access_filter &= !self.keep_private_methods;
        config.keep_source_debug_info |= self.keep_source_debug_info;
        config.copy_kotlin_module &= !self.no_kotlin_module;
        config
    }
}

fn parse_job(value: &str) -> Result<(PathBuf, PathBuf), String> {
    match value.split_once('=') {
        Some((input, output)) if !input.is_empty() && !output.is_empty() => {
            Ok((PathBuf::from(input), PathBuf::from(output)))
        }
        _ => Err(format!("expected INPUT=OUTPUT, got '{value}'")),
    }
}
