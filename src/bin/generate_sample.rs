//! Writes synthetic raw reports in the vendor export layout, for trying the
//! pipeline without real data:
//!
//! ```text
//! cargo run --bin generate_sample -- raw
//! cargo run -- normalize raw merged.csv
//! ```

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

const HEADER: &str = "Major,Degree,NumSalariesReported,Avg,Max,Min,StDev,25th,Median,75th";

/// Minimal deterministic PRNG (xoshiro256**)
struct SimpleRng {
    state: [u64; 4],
}

impl SimpleRng {
    fn new(seed: u64) -> Self {
        let mut s = [0u64; 4];
        let mut x = seed;
        for slot in &mut s {
            x = x.wrapping_mul(6364136223846793005).wrapping_add(1);
            *slot = x;
        }
        SimpleRng { state: s }
    }

    fn next_u64(&mut self) -> u64 {
        let result = (self.state[1].wrapping_mul(5))
            .rotate_left(7)
            .wrapping_mul(9);
        let t = self.state[1] << 17;
        self.state[2] ^= self.state[0];
        self.state[3] ^= self.state[1];
        self.state[1] ^= self.state[2];
        self.state[0] ^= self.state[3];
        self.state[2] ^= t;
        self.state[3] = self.state[3].rotate_left(45);
        result
    }

    fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }

    fn range(&mut self, lo: f64, hi: f64) -> f64 {
        lo + (hi - lo) * self.next_f64()
    }
}

/// `52340.0` → `"$52,340"`.
fn dollars(v: f64) -> String {
    let digits = format!("{:.0}", v.max(0.0));
    let mut out = String::with_capacity(digits.len() + 4);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    format!("\"${out}\"")
}

fn salary_line(rng: &mut SimpleRng, major: &str, degree: &str, base: f64) -> String {
    let bump = match degree {
        "Master" => 1.2,
        "Doctorate" => 1.5,
        _ => 1.0,
    };
    let median = base * bump * rng.range(0.9, 1.1);
    let spread = median * rng.range(0.1, 0.25);
    let count = 3 + (rng.next_u64() % 60);
    let st_dev = if count < 5 {
        "N/A".to_string()
    } else {
        format!("\"+/- {}\"", dollars(spread).trim_matches('"'))
    };
    format!(
        "{major},{degree},{count},{avg},{max},{min},{st_dev},{p25},{median},{p75}",
        avg = dollars(median * rng.range(0.97, 1.05)),
        max = dollars(median + 2.5 * spread),
        min = dollars(median - 2.0 * spread),
        p25 = dollars(median - spread),
        median = dollars(median),
        p75 = dollars(median + spread),
    )
}

/// Footer rows carry a non-NA `Max` so they are never read as markers.
fn footer(out: &mut impl Write, rng: &mut SimpleRng, college: &str) -> std::io::Result<()> {
    writeln!(out, "Response Rate,,,,{:.0}%,,,,,", rng.range(60.0, 95.0))?;
    writeln!(out, "{college} Total,,,,-,,,,,")?;
    writeln!(out, "Placement Rate,,,,{:.0}%,,,,,", rng.range(70.0, 99.0))?;
    writeln!(out, ",,,,-,,,,,")
}

fn write_report(path: &Path, colleges: &[(&str, &[(&str, f64)])], rng: &mut SimpleRng) -> Result<()> {
    let file = File::create(path).with_context(|| format!("creating {}", path.display()))?;
    let mut out = BufWriter::new(file);

    writeln!(out, "{HEADER}")?;
    for (i, (college, majors)) in colleges.iter().enumerate() {
        // The first college has no marker row, only the repeated header.
        if i > 0 {
            writeln!(out, "{college},,,,,,,,,")?;
        }
        writeln!(out, "{HEADER}")?;
        for &(major, base) in majors.iter() {
            for degree in ["Bachelor", "Master", "Doctorate"] {
                if degree != "Bachelor" && rng.next_f64() < 0.4 {
                    continue;
                }
                writeln!(out, "{}", salary_line(rng, major, degree, base))?;
            }
        }
        footer(&mut out, rng, college)?;
    }
    out.flush()?;
    Ok(())
}

fn main() -> Result<()> {
    let out_dir = PathBuf::from(std::env::args().nth(1).unwrap_or_else(|| "raw".to_string()));
    std::fs::create_dir_all(&out_dir).with_context(|| format!("creating {}", out_dir.display()))?;

    let colleges: [(&str, &[(&str, f64)]); 3] = [
        (
            "College of Agriculture & Life Sciences",
            &[("Agricultural Economics", 52_000.0), ("Animal Science", 45_000.0)],
        ),
        (
            "College of Engineering",
            &[
                ("Computer Science", 85_000.0),
                ("Electrical Engineering", 75_000.0),
                ("Petroleum Engineering", 90_000.0),
            ],
        ),
        (
            "Mays Business School",
            &[("Accounting", 58_000.0), ("Finance", 62_000.0)],
        ),
    ];

    let mut rng = SimpleRng::new(42);
    let mut written = 0;
    for year in 2017..=2020 {
        for semester in ["Spring", "Summer", "Fall"] {
            let path = out_dir.join(format!("{year}_{semester}.csv"));
            write_report(&path, &colleges, &mut rng)?;
            written += 1;
        }
    }

    println!("Wrote {written} reports to {}", out_dir.display());
    Ok(())
}
