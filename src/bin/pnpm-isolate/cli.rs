//! CLI definitions using clap.

use std::path::PathBuf;

use clap::Parser;

use pnpm_isolate::IsolateOptions;

/// Isolate a single workspace from a pnpm monorepo
#[derive(Parser)]
#[command(name = "pnpm-isolate")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Workspace name or folder to isolate (defaults to the workspace
    /// containing the current directory)
    pub workspace: Option<String>,

    /// Generate a pruned pnpm-lock.yaml in the isolated output
    #[arg(long)]
    pub pnpm_lock_file: bool,

    /// Disable copying the root .npmrc file
    #[arg(long)]
    pub pnpmrc_disable: bool,

    /// Disable creation of the src-less workspaces folder
    #[arg(long)]
    pub src_less_disable: bool,

    /// Extra files to copy into the src-less folder
    #[arg(long, value_name = "GLOB")]
    pub src_less_glob: Option<String>,

    /// Keep sub-workspace dev dependencies (when sub workspaces must be
    /// built as well)
    #[arg(long)]
    pub src_less_sub_dev_deps: bool,

    /// Disable creation of the src-less prod workspaces folder
    #[arg(long)]
    pub src_less_prod_disable: bool,

    /// Extra files to copy into the src-less prod folder
    #[arg(long, value_name = "GLOB")]
    pub src_less_prod_glob: Option<String>,

    /// Disable creation of package.json
    #[arg(long)]
    pub json_file_disable: bool,

    /// Disable creation of package-prod.json (without dev dependencies)
    #[arg(long)]
    pub json_file_prod_disable: bool,

    /// Folder for all generated files
    #[arg(long, value_name = "NAME", default_value = pnpm_isolate::ops::layout::DEFAULT_OUTPUT_FOLDER)]
    pub output_folder: String,

    /// Include the root package.json dependencies and dev dependencies
    #[arg(long)]
    pub include_root_deps: bool,

    /// Copy all source files of the main workspace into the isolate folder
    #[arg(long)]
    pub src_files_enable: bool,

    /// Copy only main workspace files matching the glob
    #[arg(long, value_name = "GLOB")]
    pub src_files_include_glob: Option<String>,

    /// Copy main workspace files except those matching the glob
    #[arg(long, value_name = "GLOB")]
    pub src_files_exclude_glob: Option<String>,

    /// Exclude glob applied when copying workspaces (node_modules and the
    /// output folder are always excluded)
    #[arg(long, value_name = "GLOB")]
    pub workspaces_exclude_glob: Option<String>,

    /// Do not copy the root package.json pnpm config block
    #[arg(long)]
    pub disable_root_config: bool,

    /// Absolute path to the project root (by default the root is searched
    /// for upward)
    #[arg(long, value_name = "PATH")]
    pub project_folder: Option<PathBuf>,

    /// How many parent folders are searched for the project root
    #[arg(long, value_name = "N", default_value_t = pnpm_isolate::core::workspace::DEFAULT_MAX_DEPTH)]
    pub max_depth: u32,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,
}

impl Cli {
    /// Convert the parsed arguments into pipeline options.
    pub fn into_options(self) -> IsolateOptions {
        IsolateOptions {
            workspace: self.workspace,
            project_folder: self.project_folder,
            max_depth: self.max_depth,
            output_folder: self.output_folder,
            pnpm_lock_file: self.pnpm_lock_file,
            pnpmrc_disable: self.pnpmrc_disable,
            src_less_disable: self.src_less_disable,
            src_less_glob: self.src_less_glob,
            src_less_sub_dev_deps: self.src_less_sub_dev_deps,
            src_less_prod_disable: self.src_less_prod_disable,
            src_less_prod_glob: self.src_less_prod_glob,
            json_file_disable: self.json_file_disable,
            json_file_prod_disable: self.json_file_prod_disable,
            include_root_deps: self.include_root_deps,
            src_files_enable: self.src_files_enable,
            src_files_include_glob: self.src_files_include_glob,
            src_files_exclude_glob: self.src_files_exclude_glob,
            workspaces_exclude_glob: self.workspaces_exclude_glob,
            disable_root_config: self.disable_root_config,
        }
    }
}
