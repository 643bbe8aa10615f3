//! One scripted human against a table of bots, all in-process.
//!
//! Usage: `bot-match [bots]` with 1 to 3 bots (default 2). Set `RUST_LOG`
//! to see the room's own logs.

use std::time::Duration;

use yacht::prelude::*;
use yacht::room::RoomError;
use yacht::rules::RuleError;

// ---------------------------------------------------------------------------
// The scripted human
// ---------------------------------------------------------------------------

/// Plays one turn for `token` using the bot heuristics, the way a client
/// would: roll, look at the snapshot, hold, reroll, pick a category.
async fn play_turn(svc: &GameService, code: &str, token: &str) -> Result<ScoreReply, YachtError> {
    let mut rolled = svc.roll(code, token, None).await?;
    loop {
        let current = svc.snapshot(code).await?.snapshot;
        let Some(card) = current
            .game
            .as_ref()
            .and_then(|game| game.scorecard(game.turn().seat))
            .cloned()
        else {
            return Err(RuleError::GameFinished.into());
        };

        if !bot::should_reroll(&rolled.hand.dice, &card, rolled.roll_count) {
            let category = bot::choose_category(&rolled.hand.dice, &card)
                .ok_or(RuleError::GameFinished)?;
            return svc.select_category(code, token, category).await;
        }
        let holds = bot::choose_holds(&rolled.hand.dice);
        rolled = svc.roll(code, token, Some(holds)).await?;
    }
}

// ---------------------------------------------------------------------------
// Match
// ---------------------------------------------------------------------------

/// Runs a whole match and returns the final ranking.
async fn run_match(bots: usize, seed: Option<u64>) -> Result<Vec<RankedPlayer>, YachtError> {
    let svc = GameService::in_memory(ServiceConfig {
        room: RoomConfig {
            rng_seed: seed,
            ..RoomConfig::default()
        },
        ..ServiceConfig::default()
    });

    let code = svc.create_room().await?;
    let human = svc.join_room(code.as_str(), "you").await?;
    for n in 1..=bots {
        svc.add_bot(code.as_str(), &format!("bot-{n}")).await?;
    }
    let mut events = svc.subscribe(code.as_str()).await?;
    svc.start_game(code.as_str()).await?;
    tracing::info!(room = %code, bots, "match started");

    let mut our_turn = true;
    loop {
        if our_turn {
            let reply = play_turn(&svc, code.as_str(), &human.token).await?;
            println!(
                "round {:>2}: you scored {:>2} in {}",
                reply.round, reply.score, reply.category
            );
            our_turn = false;
            if let Some(ranking) = reply.ranking {
                return Ok(ranking);
            }
        }

        let Some(outbound) = events.recv().await else {
            return Err(RoomError::Unavailable(code).into());
        };
        let RoomOutbound::Events(envelope) = outbound else {
            continue;
        };
        for event in envelope.events {
            match event {
                RoomEvent::ScoreUpdate {
                    player_index,
                    category,
                    score,
                    ..
                } if player_index != human.player_index => {
                    println!("          bot-{player_index} scored {score:>2} in {category}");
                }
                RoomEvent::TurnChange { player_index, .. } if player_index == human.player_index => {
                    our_turn = true;
                }
                RoomEvent::GameEnd { ranking, .. } => return Ok(ranking),
                _ => {}
            }
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    yacht::logging::init_with("warn");

    let bots = match std::env::args().nth(1) {
        Some(arg) => arg.parse::<usize>()?.clamp(1, 3),
        None => 2,
    };

    let ranking = tokio::time::timeout(Duration::from_secs(60), run_match(bots, None)).await??;

    println!();
    for standing in &ranking {
        let who = if standing.player_index == 0 {
            "you".to_string()
        } else {
            format!("bot-{}", standing.player_index)
        };
        println!("#{} {who:<6} {:>4}", standing.rank, standing.grand_total);
    }
    Ok(())
}
