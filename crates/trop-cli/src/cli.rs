use std::path::PathBuf;

use clap::{ArgAction, Args, Parser, Subcommand};
use trop_core::models::Capability;

#[derive(Debug, Parser)]
#[command(name = "trop")]
#[command(version, about = "Create, update and inspect CloudFormation stacks", long_about = None)]
pub struct Cli {
    /// The AWS region.
    #[arg(long, short = 'r', global = true, env = "AWS_REGION")]
    pub region: Option<String>,

    /// Named profile from the shared AWS config.
    #[arg(long, global = true, env = "AWS_PROFILE")]
    pub profile: Option<String>,

    /// Path to the trop config file.
    #[arg(long, global = true, env = "TROP_CONFIG")]
    pub config: Option<PathBuf>,

    /// Increase log verbosity (-v info, -vv debug).
    #[arg(long, short = 'v', global = true, action = ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// List stacks.
    List {
        /// Include deleted stacks.
        #[arg(long)]
        all: bool,
    },

    /// Display stack events until the stack settles.
    Events { name: String },

    /// Show stack output values.
    Outputs {
        name: String,

        /// Output the value for given key.
        #[arg(long, short = 'k')]
        key: Option<String>,
    },

    /// Show stack parameter values.
    Parameters { name: String },

    /// Show template as JSON.
    Template {
        #[arg(env = "STACK_TEMPLATE")]
        template: PathBuf,
    },

    /// Create a new stack.
    Create(ManageArgs),

    /// Update an existing stack.
    Update(ManageArgs),
}

#[derive(Debug, Clone, Args)]
pub struct ManageArgs {
    pub name: String,

    /// Path to stack template.
    #[arg(long, short = 't', env = "STACK_TEMPLATE")]
    pub template: PathBuf,

    /// Stack parameter as `<key> <value>`.
    #[arg(
        long = "parameter",
        short = 'p',
        num_args = 2,
        value_names = ["KEY", "VALUE"],
        action = ArgAction::Append
    )]
    pub parameter: Vec<String>,

    /// Enable `CAPABILITY_IAM`.
    #[arg(long, conflicts_with = "named_iam")]
    pub iam: bool,

    /// Enable `CAPABILITY_NAMED_IAM`.
    #[arg(long)]
    pub named_iam: bool,

    /// Show stack events.
    #[arg(long)]
    pub tail: bool,
}

impl ManageArgs {
    /// `-p` values as (key, value) pairs, in command-line order.
    pub fn parameters(&self) -> Vec<(String, String)> {
        self.parameter
            .chunks_exact(2)
            .map(|pair| (pair[0].clone(), pair[1].clone()))
            .collect()
    }

    pub fn capability(&self) -> Option<Capability> {
        if self.named_iam {
            Some(Capability::NamedIam)
        } else if self.iam {
            Some(Capability::Iam)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manage(args: &[&str]) -> ManageArgs {
        let cli = Cli::try_parse_from(args).unwrap();
        match cli.command {
            Command::Create(m) | Command::Update(m) => m,
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn parameters_pair_up_in_order() {
        let args = manage(&[
            "trop", "create", "my-stack", "-t", "stack.json", "-p", "A", "1", "--parameter",
            "B", "", "-p", "A", "2",
        ]);
        assert_eq!(
            args.parameters(),
            vec![
                ("A".to_string(), "1".to_string()),
                ("B".to_string(), String::new()),
                ("A".to_string(), "2".to_string()),
            ]
        );
        assert_eq!(args.capability(), None);
        assert!(!args.tail);
    }

    #[test]
    fn capability_flags() {
        let iam = manage(&["trop", "update", "s", "-t", "t.json", "--iam", "--tail"]);
        assert_eq!(iam.capability(), Some(Capability::Iam));
        assert!(iam.tail);

        let named = manage(&["trop", "update", "s", "-t", "t.json", "--named-iam"]);
        assert_eq!(named.capability(), Some(Capability::NamedIam));
    }

    #[test]
    fn iam_flags_are_exclusive() {
        let result = Cli::try_parse_from([
            "trop", "create", "s", "-t", "t.json", "--iam", "--named-iam",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn global_region_after_subcommand() {
        let cli = Cli::try_parse_from(["trop", "list", "--all", "-r", "eu-west-1"]).unwrap();
        assert_eq!(cli.region.as_deref(), Some("eu-west-1"));
        assert!(matches!(cli.command, Command::List { all: true }));
    }

    #[test]
    fn outputs_key_short_flag() {
        let cli = Cli::try_parse_from(["trop", "outputs", "s", "-k", "SecondOutput"]).unwrap();
        match cli.command {
            Command::Outputs { name, key } => {
                assert_eq!(name, "s");
                assert_eq!(key.as_deref(), Some("SecondOutput"));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }
}
