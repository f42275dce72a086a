//! Keyword tables used by the classifier.
//!
//! All entries are lowercase; matching is substring-based against the
//! lowercased input, so "Missiles" matches "missile".

/// Terms that indicate weaponization intent.
pub const BANNED: &[&str] = &[
    // Military / combat
    "weapon",
    "combat",
    "military",
    "warfare",
    "tactical",
    "assault",
    "neutralize",
    "eliminate",
    "kill",
    "destroy",
    "attack",
    "strike",
    // Lethal systems
    "lethal",
    "deadly",
    "fatal",
    "explosive",
    "ammunition",
    "ordinance",
    "projectile",
    "missile",
    "bomb",
    "grenade",
    "mine",
    // Operations
    "infiltration",
    "assassination",
    "covert ops",
    "black ops",
    "special forces",
    "enemy",
    "target",
    "hostile",
    "threat elimination",
    "take out",
    // Weapon categories
    "firearms",
    "guns",
    "rifles",
    "pistols",
    "automatic weapons",
    "chemical weapons",
    "biological weapons",
    "poison gas",
    "nerve agent",
    // Military tech
    "stealth platform",
    "camo suit",
    "invisibility cloak",
    "combat suit",
    "armor piercing",
    "anti-personnel",
    "frag",
    "incendiary",
    // Surveillance for harm
    "target tracking",
    "kill chain",
    "threat assessment for elimination",
    // Autonomous weapons
    "autonomous targeting",
    "auto-kill",
    "unmanned weapon",
    "killer drone",
];

/// A flagged term containing any of these escalates straight to critical.
pub const CRITICAL: &[&str] = &[
    "kill",
    "assassination",
    "explosive",
    "chemical weapon",
    "biological weapon",
];

/// Medical and educational context that can override a high severity.
pub const APPROVED: &[&str] = &[
    "medical",
    "diagnostic",
    "therapeutic",
    "healing",
    "treatment",
    "educational",
    "teaching",
    "learning",
    "accessibility",
    "disability",
    "health",
    "wellness",
    "mental health",
    "physical therapy",
    "prosthetic",
    "assistive device",
    "quality of life",
];
