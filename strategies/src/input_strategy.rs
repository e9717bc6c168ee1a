use std::io::{self, Write};
use std::time::Instant;

use itertools::Itertools;
use regex::Regex;
use types::{Card, Placement, PlacementChoice, PlacementStrategy, RoundCard};

#[derive(Debug, Default)]
pub struct InputStrategy {}

impl PlacementStrategy for InputStrategy {
    fn choose_placement(&mut self, hand: &[Card], card: &RoundCard) -> PlacementChoice {
        print_hand(hand);
        println!("New card: {card}");
        println!(
            "Type a slot from 0 to {} (\"place N\" or just N), or \"timeout\"",
            hand.len()
        );

        let started = Instant::now();
        let mut buf = String::new();
        loop {
            match select_placement_from_stdin(&mut buf, hand.len()) {
                Ok(placement) => {
                    let elapsed = u32::try_from(started.elapsed().as_secs()).unwrap_or(u32::MAX);
                    return PlacementChoice::new(placement, Some(elapsed));
                }
                Err(err) => {
                    buf.clear();
                    log::error!("Error parsing placement from stdin: {err}")
                }
            }
        }
    }
}

fn print_hand(hand: &[Card]) {
    println!(
        "Your hand: {}",
        hand.iter()
            .enumerate()
            .map(|(slot, card)| format!("[{slot}] {} ({:.1})", card.name, card.misfortune_index))
            .join(" | ")
    );
}

fn select_placement_from_stdin(buf: &mut String, hand_size: usize) -> Result<Placement, String> {
    print!("Your placement? >> ");
    let _ = io::stdout().flush();
    match io::stdin().read_line(buf) {
        Ok(0) => Ok(Placement::Timeout),
        Ok(_) => select_placement_from_str(buf, hand_size),
        Err(err) => {
            buf.clear();
            Err(format!("Error reading line from stdin: {err}"))
        }
    }
}

fn select_placement_from_str(input: &str, hand_size: usize) -> Result<Placement, String> {
    let input = input.trim().to_lowercase();

    let timeout_re = Regex::new(r"^(timeout|t)$").expect("Valid timeout regex");
    if timeout_re.is_match(&input) {
        return Ok(Placement::Timeout);
    }

    let place_re = Regex::new(r"^(?:place\s+)?(?<slot>\d+)$").expect("Valid place regex");
    let Some(caps) = place_re.captures(&input) else {
        return Err(format!(
            "Unable to parse a placement or timeout from string: {input}"
        ));
    };
    let slot: usize = caps["slot"]
        .parse()
        .map_err(|err| format!("Invalid slot {}: {err}", &caps["slot"]))?;
    if slot > hand_size {
        return Err(format!("Slot {slot} is past the end of a {hand_size}-card hand"));
    }
    Ok(Placement::At(slot))
}
