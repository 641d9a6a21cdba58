use crate::error::IdentcheckError;

use ident_core::SameUserEvaluator;

use std::process::ExitCode;

pub fn run(evaluator: &SameUserEvaluator<'_>) -> Result<ExitCode, IdentcheckError> {
    let identity = evaluator.identity();

    match identity.uid() {
        Some(uid) => println!("{} (uid {uid})", identity.username()),
        None => println!("{}", identity.username()),
    }

    Ok(ExitCode::SUCCESS)
}
