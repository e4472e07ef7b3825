use gojira::run;
use miette::Result;

#[tokio::main]
async fn main() -> Result<()> {
    run().await
}
