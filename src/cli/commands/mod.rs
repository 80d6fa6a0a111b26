//! CLI commands implementation.
//!
//! This module contains the CLI parser and dispatches to command-specific modules.

mod annotations;
mod entity;
mod export;
mod import;
mod ner;
mod propagate;
mod relation;
mod schema;
mod session;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use annie::config::{load_settings_with_options, LoadOptions};
use annie::formats::UnknownTagPolicy;
use annie::models::{SchemaKind, Span};

#[derive(Parser)]
#[command(name = "annie")]
#[command(about = "Annotate named entities and relations in plain-text corpora")]
#[command(version)]
pub struct Cli {
    /// Session file (overrides config and ANNIE_SESSION)
    #[arg(short, long, global = true)]
    session: Option<PathBuf>,

    /// Config file path (overrides auto-discovery)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Resolve relative paths from current working directory instead of config file location
    #[arg(long, global = true)]
    cwd: bool,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Check if verbose mode is enabled (for early logging setup).
pub fn is_verbose() -> bool {
    std::env::args().any(|arg| arg == "-v" || arg == "--verbose")
}

#[derive(Subcommand)]
enum Commands {
    /// Start a session over every .txt file of a directory
    Open {
        /// Directory holding the documents
        dir: PathBuf,
        /// Replace an existing session file
        #[arg(short, long)]
        force: bool,
    },

    /// Show session summary
    Status,

    /// List session files
    Ls,

    /// Make a file current (by number, path, name or name prefix)
    Goto {
        file: String,
    },

    /// Move to the next file
    Next,

    /// Move to the previous file
    Prev,

    /// Show a document with its entities and relations
    Show {
        /// File (defaults to the current file)
        #[arg(short, long)]
        file: Option<String>,
        /// Omit the document text
        #[arg(long)]
        no_text: bool,
    },

    /// Add, remove, merge, demerge and relabel entities
    Entity {
        #[command(subcommand)]
        command: EntityCommands,
    },

    /// Add, flip and remove relations
    Relation {
        #[command(subcommand)]
        command: RelationCommands,
    },

    /// Copy annotations onto every matching span of the session
    Propagate {
        #[command(subcommand)]
        command: PropagateCommands,
    },

    /// Manage entity tags
    Tags {
        #[command(subcommand)]
        command: SchemaCommands,
    },

    /// Manage relation types
    RelationTypes {
        #[command(subcommand)]
        command: SchemaCommands,
    },

    /// Show or change session flags
    Flags {
        /// Widen selections and propagated matches to whole words
        #[arg(long)]
        extend_to_word: Option<bool>,
        /// Allow entities to overlap
        #[arg(long)]
        allow_overlap: Option<bool>,
    },

    /// Export entities of the session
    Export {
        #[command(subcommand)]
        command: ExportCommands,
    },

    /// Import an annotated corpus as a new session
    Import {
        #[command(subcommand)]
        command: ImportCommands,
    },

    /// Save or load annotations separately from the session
    Annotations {
        #[command(subcommand)]
        command: AnnotationsCommands,
    },

    /// Pre-annotate documents with the configured NER backend
    Ner {
        /// File to annotate (defaults to the current file)
        #[arg(short, long, conflicts_with = "all")]
        file: Option<String>,
        /// Annotate every file of the session
        #[arg(short, long)]
        all: bool,
    },
}

#[derive(Subcommand)]
enum EntityCommands {
    /// Add an entity by span (e.g. 3.0-3.10) or by text
    Add {
        /// Span as LINE.CHAR-LINE.CHAR (lines from 1, characters from 0)
        #[arg(required_unless_present = "text", conflicts_with = "text")]
        span: Option<Span>,
        /// Tag for the new entity
        #[arg(short, long)]
        tag: String,
        /// Annotate this literal text instead of a span
        #[arg(long)]
        text: Option<String>,
        /// Which occurrence of --text to annotate (from 1)
        #[arg(long, default_value = "1", requires = "text")]
        occurrence: usize,
        #[arg(short, long)]
        file: Option<String>,
    },
    /// Remove an entity with all its instances, or one instance given as #N
    Remove {
        selector: String,
        #[arg(short, long)]
        file: Option<String>,
    },
    /// Give entities one shared id
    Merge {
        /// Entities as #N or id prefixes
        #[arg(num_args = 2.., required = true)]
        selectors: Vec<String>,
        #[arg(short, long)]
        file: Option<String>,
    },
    /// Detach one instance (#N) from its merge group
    Demerge {
        instance: String,
        #[arg(short, long)]
        file: Option<String>,
    },
    /// Change the tag of entities
    Relabel {
        #[arg(required = true)]
        selectors: Vec<String>,
        #[arg(short, long)]
        tag: String,
        #[arg(short, long)]
        file: Option<String>,
    },
}

#[derive(Subcommand)]
enum RelationCommands {
    /// Add a relation from HEAD to TAIL
    Add {
        head: String,
        tail: String,
        /// Relation type
        #[arg(short = 't', long = "type")]
        relation_type: String,
        #[arg(short, long)]
        file: Option<String>,
    },
    /// Swap head and tail of a relation
    Flip {
        selector: String,
        #[arg(short, long)]
        file: Option<String>,
    },
    /// Remove a relation
    Remove {
        selector: String,
        #[arg(short, long)]
        file: Option<String>,
    },
}

#[derive(Subcommand)]
enum PropagateCommands {
    /// Propagate the text and tag of one entity
    Span {
        selector: String,
        #[arg(short, long)]
        file: Option<String>,
        /// Only match whole words
        #[arg(short, long)]
        whole_word: bool,
    },
    /// Propagate every entity of a file
    File {
        #[arg(short, long)]
        file: Option<String>,
        #[arg(short, long)]
        whole_word: bool,
    },
    /// Propagate a text<TAB>tag dictionary
    Dictionary {
        path: PathBuf,
        #[arg(short, long)]
        whole_word: bool,
        /// Add tags missing from the schema instead of skipping their entries
        #[arg(long)]
        add_unknown_tags: bool,
    },
}

#[derive(Subcommand)]
enum SchemaCommands {
    /// List names
    List,
    /// Add a name
    Add { name: String },
    /// Remove a name (existing annotations keep it)
    Remove { name: String },
}

#[derive(Subcommand)]
enum ExportCommands {
    /// spaCy-style JSON lines
    Jsonl {
        /// Output file (defaults to stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// CoNLL-2003 IOB2
    Conll {
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

/// What to do with entities whose tag is not in the schema.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum UnknownTags {
    /// Add the tag to the schema
    #[default]
    Add,
    /// Drop the entity
    Skip,
}

impl From<UnknownTags> for UnknownTagPolicy {
    fn from(value: UnknownTags) -> Self {
        match value {
            UnknownTags::Add => UnknownTagPolicy::Add,
            UnknownTags::Skip => UnknownTagPolicy::Skip,
        }
    }
}

#[derive(clap::Args)]
struct ImportArgs {
    /// File to import
    input: PathBuf,
    /// Directory receiving the imported_NNNN.txt files
    #[arg(short, long)]
    out_dir: PathBuf,
    #[arg(long, value_enum, default_value_t = UnknownTags::Add)]
    unknown_tags: UnknownTags,
    /// Replace an existing session file
    #[arg(long)]
    force: bool,
}

#[derive(Subcommand)]
enum ImportCommands {
    /// spaCy-style JSON lines
    Jsonl(ImportArgs),
    /// CoNLL-2003 IOB2
    Conll(ImportArgs),
}

#[derive(Subcommand)]
enum AnnotationsCommands {
    /// Write annotations of every file to a JSON file
    Save {
        /// Output file (defaults to <dir>_annotations.json next to the documents)
        path: Option<PathBuf>,
    },
    /// Replace annotations of matching files from a JSON file
    Load { path: PathBuf },
}

pub async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let options = LoadOptions {
        config_path: cli.config,
        session_path: cli.session,
        use_cwd: cli.cwd,
    };
    let (settings, _config) = load_settings_with_options(options).await;

    match cli.command {
        Commands::Open { dir, force } => session::cmd_open(&settings, &dir, force),
        Commands::Status => session::cmd_status(&settings),
        Commands::Ls => session::cmd_ls(&settings),
        Commands::Goto { file } => session::cmd_goto(&settings, &file),
        Commands::Next => session::cmd_step(&settings, 1),
        Commands::Prev => session::cmd_step(&settings, -1),
        Commands::Show { file, no_text } => {
            session::cmd_show(&settings, file.as_deref(), !no_text)
        }
        Commands::Entity { command } => match command {
            EntityCommands::Add {
                span,
                tag,
                text,
                occurrence,
                file,
            } => entity::cmd_add(
                &settings,
                file.as_deref(),
                span,
                text.as_deref(),
                occurrence,
                &tag,
            ),
            EntityCommands::Remove { selector, file } => {
                entity::cmd_remove(&settings, file.as_deref(), &selector)
            }
            EntityCommands::Merge { selectors, file } => {
                entity::cmd_merge(&settings, file.as_deref(), &selectors)
            }
            EntityCommands::Demerge { instance, file } => {
                entity::cmd_demerge(&settings, file.as_deref(), &instance)
            }
            EntityCommands::Relabel {
                selectors,
                tag,
                file,
            } => entity::cmd_relabel(&settings, file.as_deref(), &selectors, &tag),
        },
        Commands::Relation { command } => match command {
            RelationCommands::Add {
                head,
                tail,
                relation_type,
                file,
            } => relation::cmd_add(&settings, file.as_deref(), &head, &tail, &relation_type),
            RelationCommands::Flip { selector, file } => {
                relation::cmd_flip(&settings, file.as_deref(), &selector)
            }
            RelationCommands::Remove { selector, file } => {
                relation::cmd_remove(&settings, file.as_deref(), &selector)
            }
        },
        Commands::Propagate { command } => match command {
            PropagateCommands::Span {
                selector,
                file,
                whole_word,
            } => propagate::cmd_propagate_span(
                &settings,
                file.as_deref(),
                &selector,
                whole_word || settings.whole_word,
            ),
            PropagateCommands::File { file, whole_word } => propagate::cmd_propagate_file(
                &settings,
                file.as_deref(),
                whole_word || settings.whole_word,
            ),
            PropagateCommands::Dictionary {
                path,
                whole_word,
                add_unknown_tags,
            } => propagate::cmd_propagate_dictionary(
                &settings,
                &path,
                whole_word || settings.whole_word,
                add_unknown_tags,
            ),
        },
        Commands::Tags { command } => {
            schema::cmd_schema(&settings, SchemaKind::EntityTag, command)
        }
        Commands::RelationTypes { command } => {
            schema::cmd_schema(&settings, SchemaKind::RelationType, command)
        }
        Commands::Flags {
            extend_to_word,
            allow_overlap,
        } => schema::cmd_flags(&settings, extend_to_word, allow_overlap),
        Commands::Export { command } => match command {
            ExportCommands::Jsonl { output } => {
                export::cmd_export(&settings, export::Format::Jsonl, output.as_deref())
            }
            ExportCommands::Conll { output } => {
                export::cmd_export(&settings, export::Format::Conll, output.as_deref())
            }
        },
        Commands::Import { command } => match command {
            ImportCommands::Jsonl(args) => import::cmd_import(
                &settings,
                export::Format::Jsonl,
                &args.input,
                &args.out_dir,
                args.unknown_tags.into(),
                args.force,
            ),
            ImportCommands::Conll(args) => import::cmd_import(
                &settings,
                export::Format::Conll,
                &args.input,
                &args.out_dir,
                args.unknown_tags.into(),
                args.force,
            ),
        },
        Commands::Annotations { command } => match command {
            AnnotationsCommands::Save { path } => {
                annotations::cmd_save(&settings, path.as_deref())
            }
            AnnotationsCommands::Load { path } => annotations::cmd_load(&settings, &path),
        },
        Commands::Ner { file, all } => ner::cmd_ner(&settings, file.as_deref(), all).await,
    }
}
