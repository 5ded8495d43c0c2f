use clap::{arg, crate_version, Command};
use topk_lzend::config::{MinPqMode, STD_CONFIG};
use topk_lzend::{lzend, topk_lz78};

const RCH: &str = "unreachable was reached";

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let long_help = "Examples:
---------
Compress:      `topk-lzend compress -i my_file -o my_file.lzend`
Expand:        `topk-lzend expand -i my_file.lzend -o my_file`";

    let methods = ["lzend", "topk"];

    let mut main_cmd = Command::new("topk-lzend")
        .about("Compress and expand with the top-k/LZ-End research workbench")
        .after_long_help(long_help)
        .version(crate_version!());

    main_cmd = main_cmd.subcommand(
        Command::new("compress")
            .arg(
                arg!(-m --method [METHOD] "compression algorithm")
                    .value_parser(methods)
                    .default_value("lzend"),
            )
            .arg(arg!(-i --input <PATH> "input path").required(true))
            .arg(arg!(-o --output <PATH> "output path").required(true))
            .arg(arg!(-k --topk [K] "trie capacity for the top-k filter").value_parser(clap::value_parser!(usize)))
            .arg(arg!(-c --cols [COLS] "count-min sketch columns").value_parser(clap::value_parser!(usize)))
            .arg(arg!(-r --rows [ROWS] "count-min sketch rows").value_parser(clap::value_parser!(u8)))
            .arg(arg!(-w --window [WINDOW] "lz-end parsing window").value_parser(clap::value_parser!(usize)))
            .arg(arg!(-b --block [BLOCK] "max tokens per coded block").value_parser(clap::value_parser!(usize)))
            .about("compress a file"),
    );

    main_cmd = main_cmd.subcommand(
        Command::new("expand")
            .arg(
                arg!(-m --method [METHOD] "compression algorithm")
                    .value_parser(methods)
                    .default_value("lzend"),
            )
            .arg(arg!(-i --input <PATH> "input path").required(true))
            .arg(arg!(-o --output <PATH> "output path").required(true))
            .about("expand a file"),
    );

    let matches = main_cmd.get_matches();

    if let Some(cmd) = matches.subcommand_matches("compress") {
        let path_in = cmd.get_one::<String>("input").expect(RCH);
        let path_out = cmd.get_one::<String>("output").expect(RCH);
        let method = cmd.get_one::<String>("method").expect(RCH);

        let mut cfg = STD_CONFIG;
        if let Some(&k) = cmd.get_one::<usize>("topk") {
            cfg.k = k;
        }
        if let Some(&cols) = cmd.get_one::<usize>("cols") {
            cfg.sketch_columns = cols;
        }
        if let Some(&rows) = cmd.get_one::<u8>("rows") {
            cfg.sketch_rows = rows;
        }
        if let Some(&window) = cmd.get_one::<usize>("window") {
            cfg.window = window;
        }
        if let Some(&block) = cmd.get_one::<usize>("block") {
            cfg.block = block;
        }
        cfg.min_pq_mode = MinPqMode::Exact;
        cfg.validate()?;

        log::info!("compressing {path_in} -> {path_out} with k={}", cfg.k);
        let dat = std::fs::read(path_in)?;
        let compressed = match method.as_str() {
            "lzend" => lzend::compress(&dat, &cfg)?,
            "topk" => topk_lz78::compress(&dat, &cfg)?,
            _ => {
                eprintln!("{method} not supported");
                return Err(Box::new(std::fmt::Error));
            }
        };
        std::fs::write(path_out, compressed)?;
    }

    if let Some(cmd) = matches.subcommand_matches("expand") {
        let path_in = cmd.get_one::<String>("input").expect(RCH);
        let path_out = cmd.get_one::<String>("output").expect(RCH);
        let method = cmd.get_one::<String>("method").expect(RCH);

        log::info!("expanding {path_in} -> {path_out}");
        let dat = std::fs::read(path_in)?;
        let expanded: Vec<u8> = match method.as_str() {
            "lzend" => lzend::expand(&dat)?,
            "topk" => topk_lz78::expand(&dat)?,
            _ => {
                eprintln!("{method} not supported");
                return Err(Box::new(std::fmt::Error));
            }
        };
        std::fs::write(path_out, expanded)?;
    }

    Ok(())
}
