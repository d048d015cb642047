use roff::{bold, roman, Roff};
use std::fs;
use std::path::Path;

struct Example<'a> {
    title: &'a str,
    description: &'a str,
    code: &'a str,
}

struct ManPage<'a> {
    name: &'a str,
    about: &'a str,
    description: &'a str,
    synopsis: &'a str,
    options: &'a [(&'a str, &'a str)],
    examples: &'a [Example<'a>],
    exit_status: &'a str,
    environment: &'a str,
    see_also: &'a str,
    warnings: &'a str,
}

fn render_man_page(page: &ManPage, out_dir: &Path) {
    let version = env!("CARGO_PKG_VERSION");
    let upper_name = page.name.to_uppercase();
    let date_version = format!("{} {}", page.name, version);
    let mut roff = Roff::default();
    roff.control("TH", [upper_name.as_str(), "1", date_version.as_str()]);
    roff.control("SH", ["NAME"]);
    roff.text([roman(format!("{} - {}", page.name, page.about))]);
    roff.control("SH", ["SYNOPSIS"]);
    roff.text([bold(page.name), roman(format!(" {}", page.synopsis))]);
    roff.control("SH", ["DESCRIPTION"]);
    roff.text([roman(page.description)]);
    if !page.options.is_empty() {
        roff.control("SH", ["OPTIONS"]);
        for (flag, help) in page.options {
            roff.control("TP", []);
            roff.text([bold(*flag)]);
            roff.text([roman(*help)]);
        }
    }
    if !page.examples.is_empty() {
        roff.control("SH", ["EXAMPLES"]);
        for example in page.examples {
            roff.text([bold(example.title)]);
            roff.text([roman(example.description)]);
            roff.control("sp", [] as [&str; 0]);
            roff.control("nf", [] as [&str; 0]);
            roff.control("RS", ["4"]);
            for line in example.code.lines() {
                roff.text([roman(line)]);
            }
            roff.control("RE", [] as [&str; 0]);
            roff.control("fi", [] as [&str; 0]);
        }
    }
    if !page.exit_status.is_empty() {
        roff.control("SH", ["EXIT STATUS"]);
        roff.text([roman(page.exit_status)]);
    }
    if !page.environment.is_empty() {
        roff.control("SH", ["ENVIRONMENT"]);
        for line in page.environment.lines() {
            if let Some((var, desc)) = line.split_once('\t') {
                roff.control("TP", []);
                roff.text([bold(var)]);
                roff.text([roman(desc)]);
            } else {
                roff.text([roman(line)]);
            }
        }
    }
    if !page.warnings.is_empty() {
        roff.control("SH", ["WARNINGS"]);
        roff.text([roman(page.warnings)]);
    }
    if !page.see_also.is_empty() {
        roff.control("SH", ["SEE ALSO"]);
        roff.text([roman(page.see_also)]);
    }
    fs::write(out_dir.join(format!("{}.1", page.name)), roff.to_roff()).unwrap();
}

fn main() {
    println!("cargo:rerun-if-changed=build.rs");
    let out_dir = Path::new("target/man");
    fs::create_dir_all(out_dir).unwrap();

    render_man_page(
        &ManPage {
            name: "rawsocket-helper",
            about: "open a raw socket on behalf of an unprivileged process",
            description: "Create a raw socket of the given address family and protocol and \
                          pass its descriptor over CHANNEL_FD, an AF_UNIX socket inherited from \
                          the calling process. The descriptor travels as SCM_RIGHTS ancillary \
                          data attached to a single zero byte. The helper never reads or writes \
                          the raw socket and closes its own copy before exiting. \
                          It is meant to be installed with CAP_NET_RAW so that the caller \
                          does not need the capability itself.",
            synopsis: "CHANNEL_FD FAMILY PROTOCOL",
            options: &[
                ("-h, --help", "Print usage and exit."),
                ("-V, --version", "Print version and exit."),
            ],
            examples: &[Example {
                title: "Example 1 Request an ICMP socket",
                description: "Pass descriptor 3, one end of a socketpair(2), and ask for an \
                              AF_INET (2) socket for IPPROTO_ICMP (1).",
                code: "$ rawsocket-helper 3 2 1",
            }],
            exit_status: "0 if the descriptor was passed. 1 if the arguments are malformed, \
                          the socket cannot be created, or the descriptor cannot be sent.",
            environment: "RAWSOCKET_HELPER_VERBOSE\tWhen set to a value other than empty, \
                          0 or false, echo the arguments and progress to standard output.",
            see_also: "socket(2), sendmsg(2), unix(7), capabilities(7), raw(7)",
            warnings: "Arguments must be plain base-10 integers. Empty arguments are rejected.",
        },
        out_dir,
    );
}
