use clap::*;
use nplink::libs::io::DatasetLoader;
use nplink::libs::linking::{LinkingConfig, MetcalfWeights};
use nplink::libs::scoring::*;
use nplink::libs::strain::StrainCollection;
use std::path::PathBuf;
use std::sync::Arc;

// Create clap subcommand arguments
pub fn make_subcommand() -> Command {
    Command::new("link")
        .about("Score links between GCFs and spectra / molecular families")
        .after_help(
            r###"
Links every GCF to the spectra and molecular families that occur in the same strains.

Input tables are tab-separated, `#` starts a comment line:
* --gcf:     gcf_id  bgc_id  strain  [bigscape_class  [products]]
             (strain `-` for MiBIG reference BGCs, products comma separated)
* --spectra: spectrum_id  strain  intensity  [medium]
* --mf:      family_id  spectrum_id        (spectra without a family become singletons)

Scoring methods:
* metcalf   - weighted co-occurrence counts, --standardised for z-scores
* hg        - hypergeometric p-value, links with p <= cutoff are kept
* likescore - co-occurrence likelihood in [0, 1)

Output columns:
    index  genomic_object_type  genomic_object_id  metabolomic_object_type
    metabolomic_object_id  metcalf_score  hg_score  likescore_score  shared_strains

Examples:
1. Metcalf scores of all GCFs:
   nplink link --gcf gcf.tsv --spectra spectra.tsv --mf mf.tsv

2. Standardised Metcalf scores, strains named by a mapping file:
   nplink link --strains strain_mappings.json --gcf gcf.tsv --spectra spectra.tsv \
       --standardised --cutoff 1.5

3. Every method, only strains with both genomic and metabolomic data:
   nplink link --gcf gcf.tsv --spectra spectra.tsv --method metcalf,hg,likescore --common

4. Reuse scores between runs:
   nplink link --gcf gcf.tsv --spectra spectra.tsv --cache .nplink -o links.tsv
"###,
        )
        .arg(
            Arg::new("strains")
                .long("strains")
                .num_args(1)
                .help("Strain mappings JSON. Default: strains named in the tables"),
        )
        .arg(
            Arg::new("gcf")
                .long("gcf")
                .required(true)
                .num_args(1)
                .help("GCF membership table. [stdin] for standard input"),
        )
        .arg(
            Arg::new("spectra")
                .long("spectra")
                .required(true)
                .num_args(1)
                .help("Spectrum abundance table"),
        )
        .arg(
            Arg::new("mf")
                .long("mf")
                .num_args(1)
                .help("Molecular family table"),
        )
        .arg(
            Arg::new("method")
                .long("method")
                .num_args(1)
                .default_value("metcalf")
                .help("Scoring methods, comma separated: metcalf, hg, likescore"),
        )
        .arg(
            Arg::new("cutoff")
                .long("cutoff")
                .num_args(1)
                .value_parser(value_parser!(f64))
                .help("Score cutoff. Default: 0 for metcalf and likescore, 0.05 for hg"),
        )
        .arg(
            Arg::new("standardised")
                .long("standardised")
                .action(ArgAction::SetTrue)
                .help("Standardise Metcalf scores against the null model"),
        )
        .arg(
            Arg::new("weights")
                .long("weights")
                .num_args(1)
                .default_value("10,-10,0,1")
                .help("Metcalf weights: both,type1_only,gcf_only,neither"),
        )
        .arg(
            Arg::new("alpha")
                .long("alpha")
                .num_args(1)
                .value_parser(value_parser!(f64))
                .default_value("0.5")
                .help("Rate of the overlap term of likescore"),
        )
        .arg(
            Arg::new("common")
                .long("common")
                .action(ArgAction::SetTrue)
                .help("Keep only strains with both genomic and metabolomic data"),
        )
        .arg(
            Arg::new("keep")
                .long("keep")
                .num_args(1)
                .help("Keep only these strains, comma separated ids or aliases"),
        )
        .arg(
            Arg::new("mibig")
                .long("mibig")
                .action(ArgAction::SetTrue)
                .help("Include GCFs made of MiBIG reference BGCs only"),
        )
        .arg(
            Arg::new("no_singletons")
                .long("no-singletons")
                .action(ArgAction::SetTrue)
                .help("Exclude singleton molecular families"),
        )
        .arg(
            Arg::new("cache")
                .long("cache")
                .num_args(1)
                .help("Directory of the score cache"),
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
    //----------------------------
    // Args
    //----------------------------
    let methods = args
        .get_one::<String>("method")
        .unwrap()
        .split(',')
        .map(|s| s.trim().parse::<ScoringMethod>())
        .collect::<Result<Vec<_>, _>>()?;
    let cutoff = args.get_one::<f64>("cutoff").copied();
    let standardised = args.get_flag("standardised");

    let options = ScoringOptions {
        weights: args.get_one::<String>("weights").unwrap().parse::<MetcalfWeights>()?,
        alpha: *args.get_one::<f64>("alpha").unwrap(),
        linking: LinkingConfig {
            include_mibig_only: args.get_flag("mibig"),
            include_singletons: !args.get_flag("no_singletons"),
        },
        cache_dir: args.get_one::<String>("cache").map(PathBuf::from),
    };

    //----------------------------
    // Load
    //----------------------------
    let strains = match args.get_one::<String>("strains") {
        Some(path) => Some(StrainCollection::read_json(path)?),
        None => None,
    };
    let mut loader = DatasetLoader::new(strains);
    loader.read_gcfs(intspan::reader(args.get_one::<String>("gcf").unwrap()))?;
    loader.read_spectra(intspan::reader(args.get_one::<String>("spectra").unwrap()))?;
    if let Some(mf) = args.get_one::<String>("mf") {
        loader.read_families(intspan::reader(mf))?;
    }
    let mut dataset = loader.build()?;

    if args.get_flag("common") {
        dataset.filter_common_strains();
    }
    if let Some(keep) = args.get_one::<String>("keep") {
        let names: Vec<&str> = keep.split(',').map(|s| s.trim()).collect();
        dataset.filter_user_strains(&names)?;
    }

    //----------------------------
    // Score
    //----------------------------
    let session = Arc::new(ScoringSession::setup(&dataset, options)?);
    let mut lg = LinkGraph::new();
    for method in methods {
        let params = LinkParams {
            cutoff,
            standardised: Some(standardised),
        };
        let links = match method {
            ScoringMethod::Metcalf => {
                MetcalfScoring::new(session.clone()).get_all_links(&params)?
            }
            ScoringMethod::Hypergeom => {
                HypergeomScoring::new(session.clone()).get_all_links(&params)?
            }
            ScoringMethod::Likelihood => {
                LikelihoodScoring::new(session.clone()).get_all_links(&params)?
            }
        };
        log::info!("{}: {}", method, links);
        lg.merge(&links)?;
    }

    //----------------------------
    // Output
    //----------------------------
    let mut writer = intspan::writer(args.get_one::<String>("outfile").unwrap());
    lg.write_tsv(&mut writer)?;

    Ok(())
}
