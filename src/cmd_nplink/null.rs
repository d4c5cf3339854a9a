use clap::*;
use nplink::libs::linking::{MetcalfWeights, NullModel};
use std::io::Write;

// Create clap subcommand arguments
pub fn make_subcommand() -> Command {
    Command::new("null")
        .about("Print the null model of the Metcalf score")
        .after_help(
            r###"
For N strains, a metabolomic object present in n strains and a GCF present in m
strains are assumed to be placed independently. The overlap then follows a
hypergeometric distribution and the Metcalf score has the printed mean and
standard deviation.

Output columns:
    n  m  mean  std

Examples:
1. Null model of 10 strains:
   nplink null --strains 10

2. Custom weights:
   nplink null --strains 10 --weights 5,-5,0,1 -o null.tsv
"###,
        )
        .arg(
            Arg::new("strains")
                .long("strains")
                .required(true)
                .num_args(1)
                .value_parser(value_parser!(usize))
                .help("Number of strains"),
        )
        .arg(
            Arg::new("weights")
                .long("weights")
                .num_args(1)
                .default_value("10,-10,0,1")
                .help("Metcalf weights: both,type1_only,gcf_only,neither"),
        )
        .arg(
            Arg::new("outfile")
                .short('o')
                .long("outfile")
                .num_args(1)
                .default_value("stdout")
                .help("Output filename. [stdout] for screen"),
        )
}

// command implementation
pub fn execute(args: &ArgMatches) -> anyhow::Result<()> {
    let n_strains = *args.get_one::<usize>("strains").unwrap();
    let weights = args
        .get_one::<String>("weights")
        .unwrap()
        .parse::<MetcalfWeights>()?;

    let null_model = NullModel::build(n_strains, weights)?;

    let mut writer = intspan::writer(args.get_one::<String>("outfile").unwrap());
    writer.write_fmt(format_args!("n\tm\tmean\tstd\n"))?;
    for n in 0..=n_strains {
        for m in 0..=n_strains {
            writer.write_fmt(format_args!(
                "{}\t{}\t{:.4}\t{:.4}\n",
                n,
                m,
                null_model.mean()[(n, m)],
                null_model.std(n, m)
            ))?;
        }
    }

    Ok(())
}
