use clap_derive::Args as ClapArgs;
use color_eyre::eyre;
use color_eyre::eyre::Context;
use scorecast_common::models::{ContestInfo, TeamId};
use scorecast_tuning::loader::load_rules;
use std::collections::BTreeSet;
use std::path::PathBuf;

#[derive(ClapArgs, Debug)]
pub(crate) struct Args {
    /// The tuning rules document, either a list of rules or legacy advanced properties
    #[arg(value_name = "RULES_FILE")]
    pub rules_file: PathBuf,

    /// A contest info JSON document. When given, the tuned info is printed instead of the rules
    #[arg(long)]
    pub info_file: Option<PathBuf>,

    /// Teams which count as having submitted, for rules that hide teams without submissions
    #[arg(long = "submitted-team", value_name = "TEAM_ID")]
    pub submitted_teams: Vec<String>,
}

pub(crate) async fn main(args: Args) -> eyre::Result<()> {
    let rules = load_rules(&args.rules_file)
        .await
        .with_context(|| format!("unable to load the rules from {:?}", args.rules_file))?;

    let output = match args.info_file {
        None => serde_json::to_string_pretty(&rules)?,
        Some(path) => {
            let content = tokio::fs::read_to_string(&path)
                .await
                .with_context(|| format!("unable to read {path:?}"))?;
            let info: ContestInfo =
                serde_json::from_str(&content).context("unable to parse the contest info")?;
            let submitted_teams: BTreeSet<TeamId> =
                args.submitted_teams.into_iter().map(TeamId::from).collect();
            let tuned = scorecast_tuning::rules::apply(&rules, info, &submitted_teams);
            serde_json::to_string_pretty(&tuned)?
        }
    };
    println!("{output}");

    Ok(())
}
