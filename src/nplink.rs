extern crate clap;
use clap::*;

mod cmd_nplink;

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"))
        .format_timestamp(None)
        .init();

    let app = Command::new("nplink")
        .version(crate_version!())
        .author(crate_authors!())
        .about("`nplink` - Natural Product Linking by strain co-occurrence")
        .propagate_version(true)
        .arg_required_else_help(true)
        .color(ColorChoice::Auto)
        .subcommand(cmd_nplink::link::make_subcommand())
        .subcommand(cmd_nplink::null::make_subcommand())
        .after_help(
            r###"Subcommands:

* link - Score links between GCFs and spectra / molecular families
* null - Print the null model of the Metcalf score

Logging is controlled by RUST_LOG, e.g. `RUST_LOG=info nplink link ...`

"###,
        );

    // Check which subcomamnd the user ran...
    match app.get_matches().subcommand() {
        Some(("link", sub_matches)) => cmd_nplink::link::execute(sub_matches),
        Some(("null", sub_matches)) => cmd_nplink::null::execute(sub_matches),
        _ => unreachable!(),
    }?;

    Ok(())
}
