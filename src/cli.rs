use clap::Parser;

#[derive(Parser, Debug)]
#[command(name = "healthagg")]
#[command(about = "Symptom analysis and care-finder backend (Gemini + Overpass)", long_about = None)]
pub struct Args {
    #[arg(long, default_value = "127.0.0.1")]
    pub host: String,

    #[arg(long, default_value_t = 5000)]
    pub port: u16,
}
