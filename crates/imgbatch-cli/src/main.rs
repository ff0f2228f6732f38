use imgbatch_lib::cli::{ResolvedCommand, parse_args, resolve_command, run_download, run_plan};
use imgbatch_lib::error::ImgBatchError;

#[tokio::main(flavor = "multi_thread")]
async fn main() -> Result<(), ImgBatchError> {
    color_eyre::install()?;

    let args = parse_args();
    let command = resolve_command(args.command)?;

    match command {
        ResolvedCommand::Download(params) => {
            run_download(params).await?;
        }
        ResolvedCommand::Plan(params) => {
            run_plan(params).await?;
        }
    }

    Ok(())
}
