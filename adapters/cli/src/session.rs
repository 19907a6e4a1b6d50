use std::{collections::BTreeMap, fmt, time::Duration};

use spawn_director_core::{Command, Event, Rarity};
use spawn_director_system_director::SpawnDirector;
use spawn_director_world::{apply, query, World};
use tracing::{debug, info};

/// Automated stand-in for the player: retires old hostiles, damages the boss,
/// dismisses level-up screens, and always takes the first card on offer.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct Autoplay {
    /// Age at which an ordinary hostile is killed.
    pub(crate) hostile_lifetime: Duration,
    /// Damage dealt to the boss per second once it is vulnerable.
    pub(crate) boss_dps: f32,
}

/// Headless run wiring the director to the world.
#[derive(Debug)]
pub(crate) struct Session {
    world: World,
    director: SpawnDirector,
    autoplay: Autoplay,
    inbox: Vec<Event>,
    summary: Summary,
}

impl Session {
    pub(crate) fn new(world: World, director: SpawnDirector, autoplay: Autoplay) -> Self {
        Self {
            world,
            director,
            autoplay,
            inbox: Vec::new(),
            summary: Summary::default(),
        }
    }

    /// Advances the run by `duration` in steps of `tick`.
    pub(crate) fn run(&mut self, duration: Duration, tick: Duration) {
        let mut remaining = duration;
        while !remaining.is_zero() {
            let dt = remaining.min(tick);
            remaining -= dt;
            self.frame(dt);
        }
        self.summary.elapsed = query::elapsed(&self.world);
        self.summary.rarity_clock = self.director.rarity_clock();
        self.summary.tier_index = self.director.scaling().tier_index();
        self.summary.multipliers = (
            self.director.scaling().health_multiplier(),
            self.director.scaling().exp_multiplier(),
            self.director.scaling().damage_multiplier(),
        );
        self.summary.boss_events_completed = self.director.scaling().completed_boss_count();
        self.summary.sources = self.director.registry().len();
        (self.summary.level, self.summary.experience) = query::progression(&self.world);
    }

    pub(crate) fn summary(&self) -> &Summary {
        &self.summary
    }

    fn frame(&mut self, dt: Duration) {
        let mut events = std::mem::take(&mut self.inbox);
        apply(&mut self.world, Command::Tick { dt }, &mut events);
        let context = query::context(&self.world);

        let mut commands = Vec::new();
        self.director.handle(&events, &context, &mut commands);

        let mut next = Vec::new();
        for command in commands {
            self.summary.record(&command);
            apply(&mut self.world, command, &mut next);
        }
        self.play(dt, &mut next);
        for event in &next {
            if let Event::BossDefeated { handle, .. } = event {
                info!(handle = handle.get(), "boss defeated");
            }
        }
        self.inbox = next;
    }

    fn play(&mut self, dt: Duration, out: &mut Vec<Event>) {
        let expired: Vec<_> = query::hostiles(&self.world)
            .into_iter()
            .filter(|hostile| hostile.age >= self.autoplay.hostile_lifetime)
            .map(|hostile| hostile.handle)
            .collect();
        for handle in expired {
            apply(&mut self.world, Command::DefeatHostile { handle }, out);
        }

        if query::boss(&self.world).is_some() && self.autoplay.boss_dps > 0.0 {
            let amount = self.autoplay.boss_dps * dt.as_secs_f32();
            apply(&mut self.world, Command::DamageBoss { amount }, out);
        }
        if query::level_up_pending(&self.world) {
            apply(&mut self.world, Command::DismissLevelUp, out);
        }
        if let Some(offer) = query::open_offer(&self.world) {
            if let Some(pick) = offer.candidates.first() {
                debug!(offer = offer.offer.get(), card = pick.card.get(), "auto-picking card");
                self.summary.picks += 1;
                apply(
                    &mut self.world,
                    Command::SelectCard {
                        offer: offer.offer,
                        card: pick.card,
                        interval_override: None,
                    },
                    out,
                );
            }
        }
    }
}

/// Totals reported once the run ends.
#[derive(Clone, Debug, Default, PartialEq)]
pub(crate) struct Summary {
    elapsed: Duration,
    rarity_clock: Duration,
    hostiles_requested: u64,
    by_rarity: BTreeMap<Rarity, u64>,
    bosses_spawned: u32,
    boss_events_completed: u32,
    offers: u32,
    picks: u32,
    sources: usize,
    tier_index: u32,
    multipliers: (f32, f32, f32),
    level: u32,
    experience: u64,
}

impl Summary {
    fn record(&mut self, command: &Command) {
        match command {
            Command::SpawnHostile { rarity, .. } => {
                self.hostiles_requested += 1;
                *self.by_rarity.entry(*rarity).or_default() += 1;
            }
            Command::SpawnBoss { .. } => self.bosses_spawned += 1,
            Command::OfferCards { .. } => self.offers += 1,
            _ => {}
        }
    }
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (health, experience, damage) = self.multipliers;
        writeln!(f, "simulated time:        {:.1}s", self.elapsed.as_secs_f32())?;
        writeln!(f, "rarity clock:          {:.1}s", self.rarity_clock.as_secs_f32())?;
        writeln!(f, "hostiles requested:    {}", self.hostiles_requested)?;
        for (rarity, count) in &self.by_rarity {
            let label = format!("{rarity:?}").to_lowercase();
            writeln!(f, "  {label:<20} {count}")?;
        }
        writeln!(f, "bosses spawned:        {}", self.bosses_spawned)?;
        writeln!(f, "boss events completed: {}", self.boss_events_completed)?;
        writeln!(f, "card offers:           {} ({} picked)", self.offers, self.picks)?;
        writeln!(f, "active sources:        {}", self.sources)?;
        writeln!(f, "scaling tier:          {}", self.tier_index)?;
        writeln!(
            f,
            "multipliers:           health x{health:.2}, exp x{experience:.2}, damage x{damage:.2}"
        )?;
        write!(f, "player:                level {} ({} exp)", self.level, self.experience)
    }
}
