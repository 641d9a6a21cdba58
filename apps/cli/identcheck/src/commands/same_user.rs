use crate::cli::ConnectionArgs;
use crate::commands::EXIT_OTHER_USER;
use crate::error::IdentcheckError;

use ident_core::{AccessDecision, Endpoints, IdentClient, IdentError, SameUserEvaluator};

use std::process::ExitCode;

use log::info;

/// Exit 0 for the same user, 3 for anybody else, an error when ident failed.
pub async fn run(
    client: &IdentClient,
    evaluator: &SameUserEvaluator<'_>,
    args: &ConnectionArgs,
) -> Result<ExitCode, IdentcheckError> {
    let endpoints = Endpoints::new(args.local, args.remote);
    let result = client.query_async(endpoints, args.timeout()).await;
    let decision = evaluator.check(&result);

    info!(
        "Same-user check for {} as {}: {decision:?}",
        args.remote,
        evaluator.identity().username()
    );
    println!("{}", decision.status());

    match (decision, result) {
        (AccessDecision::SameUser, _) => Ok(ExitCode::SUCCESS),
        (AccessDecision::OtherUser, _) => Ok(ExitCode::from(EXIT_OTHER_USER)),
        (AccessDecision::Failed(_), Err(error)) => Err(error.into()),
        (AccessDecision::Failed(kind), Ok(_)) => Err(IdentError::transport(format!(
            "Ident lookup failed ({kind})"
        ))
        .into()),
    }
}
