use argh::FromArgs;

/// Inspect SRB2Kart WAD and PK3 packages
#[derive(Debug, Clone, FromArgs)]
pub struct CLIOptions {
    /// verbose level: off, error, warn, info, debug
    #[argh(option)]
    pub verbose: Option<log::LevelFilter>,
    /// path to the base package supplying PLAYPAL, normally srb2.pk3.
    /// Remembered in the user config once given
    #[argh(option, default = "Default::default()")]
    pub base: String,
    #[argh(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, FromArgs)]
#[argh(subcommand)]
pub enum Command {
    Ls(LsCommand),
    Text(TextCommand),
    Socs(SocsCommand),
    Image(ImageCommand),
}

/// List the files of a package
#[derive(Debug, Clone, FromArgs)]
#[argh(subcommand, name = "ls")]
pub struct LsCommand {
    /// the package
    #[argh(positional)]
    pub file: String,
    /// only paths matching this regex
    #[argh(option)]
    pub pattern: Option<String>,
}

/// Print an entry as text
#[derive(Debug, Clone, FromArgs)]
#[argh(subcommand, name = "text")]
pub struct TextCommand {
    /// the package
    #[argh(positional)]
    pub file: String,
    /// path of the entry, or lump name
    #[argh(positional)]
    pub entry: String,
}

/// Print the merged SOC of a package
#[derive(Debug, Clone, FromArgs)]
#[argh(subcommand, name = "socs")]
pub struct SocsCommand {
    /// the package
    #[argh(positional)]
    pub file: String,
    /// only blocks of this kind, e.g. level
    #[argh(option)]
    pub kind: Option<String>,
    /// only the block with this name, needs --kind
    #[argh(option)]
    pub name: Option<String>,
}

/// Decode a picture and save it as PNG
#[derive(Debug, Clone, FromArgs)]
#[argh(subcommand, name = "image")]
pub struct ImageCommand {
    /// the package
    #[argh(positional)]
    pub file: String,
    /// path of the picture, or lump name
    #[argh(positional)]
    pub entry: String,
    /// where to write the PNG
    #[argh(option)]
    pub out: String,
}
