//! Command-line surface for `tessera-cli`.

#![deny(clippy::all, clippy::pedantic)]

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use tessera::config::Overrides;
use tessera::types::{ItemType, TagCategory};
use uuid::Uuid;

#[derive(Parser, Debug)]
#[command(name = "tessera-cli", version, about = "Tessera content API CLI", long_about = None)]
pub struct Cli {
    /// Explicit configuration file (TOML)
    #[arg(long, env = "TESSERA_CONFIG", value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Path to file containing the session token (takes precedence over env)
    #[arg(long, env = "TESSERA_TOKEN_FILE", value_name = "PATH")]
    pub token_file: Option<PathBuf>,

    #[command(flatten)]
    pub overrides: Overrides,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Item reads and bulk operations
    Items(ItemsArgs),
    /// Member lookup
    Members(MembersArgs),
    /// Item chat
    Chat(ChatArgs),
    /// Tag search
    Tags(TagsArgs),
}

#[derive(Parser, Debug)]
pub struct ItemsArgs {
    #[command(subcommand)]
    pub action: ItemsCmd,
}

#[derive(Subcommand, Debug)]
pub enum ItemsCmd {
    /// Fetch one item
    Get { id: Uuid },
    /// List the children of a folder
    Children {
        id: Uuid,
        /// Only these item types (repeatable)
        #[arg(long = "type", value_enum)]
        types: Vec<ItemTypeArg>,
        #[arg(long)]
        keywords: Option<String>,
    },
    /// Fetch any number of items
    Many {
        #[arg(required = true)]
        ids: Vec<Uuid>,
    },
    /// Delete items permanently
    Delete {
        #[arg(required = true)]
        ids: Vec<Uuid>,
    },
    /// Move items under a folder, or to the root without --to
    Move {
        #[arg(required = true)]
        ids: Vec<Uuid>,
        #[arg(long)]
        to: Option<Uuid>,
    },
    /// Move items to the recycle bin
    Recycle {
        #[arg(required = true)]
        ids: Vec<Uuid>,
    },
}

#[derive(Parser, Debug)]
pub struct MembersArgs {
    #[command(subcommand)]
    pub action: MembersCmd,
}

#[derive(Subcommand, Debug)]
pub enum MembersCmd {
    /// The member owning the session token
    Current,
}

#[derive(Parser, Debug)]
pub struct ChatArgs {
    #[command(subcommand)]
    pub action: ChatCmd,
}

#[derive(Subcommand, Debug)]
pub enum ChatCmd {
    /// List an item's chat messages
    List { item_id: Uuid },
    /// Post a message to an item's chat
    Post {
        item_id: Uuid,
        #[arg(long, conflicts_with = "body_file")]
        body: Option<String>,
        #[arg(long, value_name = "PATH")]
        body_file: Option<PathBuf>,
    },
}

#[derive(Parser, Debug)]
pub struct TagsArgs {
    #[command(subcommand)]
    pub action: TagsCmd,
}

#[derive(Subcommand, Debug)]
pub enum TagsCmd {
    /// Tag names matching a search text, with usage counts
    Search {
        text: String,
        #[arg(long, value_enum)]
        category: Option<TagCategoryArg>,
    },
}

#[derive(Copy, Clone, Debug, ValueEnum)]
pub enum ItemTypeArg {
    Folder,
    Document,
    App,
    Link,
    File,
    Shortcut,
    H5p,
    Etherpad,
}

impl From<ItemTypeArg> for ItemType {
    fn from(value: ItemTypeArg) -> Self {
        match value {
            ItemTypeArg::Folder => ItemType::Folder,
            ItemTypeArg::Document => ItemType::Document,
            ItemTypeArg::App => ItemType::App,
            ItemTypeArg::Link => ItemType::Link,
            ItemTypeArg::File => ItemType::File,
            ItemTypeArg::Shortcut => ItemType::Shortcut,
            ItemTypeArg::H5p => ItemType::H5p,
            ItemTypeArg::Etherpad => ItemType::Etherpad,
        }
    }
}

#[derive(Copy, Clone, Debug, ValueEnum)]
pub enum TagCategoryArg {
    Level,
    Discipline,
    ResourceType,
}

impl From<TagCategoryArg> for TagCategory {
    fn from(value: TagCategoryArg) -> Self {
        match value {
            TagCategoryArg::Level => TagCategory::Level,
            TagCategoryArg::Discipline => TagCategory::Discipline,
            TagCategoryArg::ResourceType => TagCategory::ResourceType,
        }
    }
}
