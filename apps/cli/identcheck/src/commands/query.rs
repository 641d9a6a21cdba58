use crate::cli::QueryArgs;
use crate::error::IdentcheckError;

use ident_core::{Endpoints, IdentClient, IdentError};
use models::IdentResponse;

use std::process::ExitCode;

use log::debug;
use tokio::sync::oneshot;

/// Run one query and print the response.
pub async fn run(client: &IdentClient, args: &QueryArgs) -> Result<ExitCode, IdentcheckError> {
    let connection = &args.connection;
    let endpoints = Endpoints::new(connection.local, connection.remote);

    let response = if args.nonblocking {
        debug!("Querying through the callback interface");
        let (tx, rx) = oneshot::channel();
        client.query_with(endpoints, connection.timeout(), move |response| {
            let _ = tx.send(response);
        });
        rx.await
            .map_err(|_| IdentcheckError::identcheck("Ident callback was dropped"))?
    } else {
        client.fetch(endpoints, connection.timeout()).await
    };

    print_response(&response, args.json)?;

    match IdentError::from_response(&response) {
        Some(error) => Err(error.into()),
        None => Ok(ExitCode::SUCCESS),
    }
}

fn print_response(response: &IdentResponse, json: bool) -> Result<(), IdentcheckError> {
    if json {
        let rendered = serde_json::to_string_pretty(response).map_err(|e| {
            IdentcheckError::identcheck(format!("Failed to serialize response: {e}"))
        })?;
        println!("{rendered}");
    } else if response.is_success() {
        println!("{response}");
    }
    Ok(())
}
