use serde::{Deserialize, Serialize};

/// Request sent from client to server.
#[derive(Debug, Serialize, Deserialize)]
pub enum Request {
    /// Run the body through a pool job and send it back.
    Echo {
        /// The payload to echo.
        body: String,
    },
}

/// Response sent from server to client.
#[derive(Debug, Serialize, Deserialize)]
pub enum Response {
    /// The job succeeded with the echoed payload.
    Ok(String),
    /// The job or the pool failed with an error message.
    Err(String),
}
