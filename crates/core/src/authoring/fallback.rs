//! Canned payloads returned when the model is unavailable or its reply
//! cannot be used. Everything here is deterministic.

use crate::story::{Character, Story, ROLE_ANTAGONIST, ROLE_PROTAGONIST, ROLE_SUPPORTING};

pub const FALLBACK_NAMES: [&str; 12] = [
    "Alex Morgan",
    "Riley Chen",
    "Jordan Blake",
    "Casey Rivera",
    "Taylor Swift",
    "Morgan Lee",
    "Avery Johnson",
    "Quinn Davis",
    "Sage Wilson",
    "River Stone",
    "Phoenix Wright",
    "Skylar Moon",
];

const DEFAULT_FONTS: [&str; 6] = [
    "Merriweather",
    "Libre Baskerville",
    "Lora",
    "Roboto",
    "Open Sans",
    "Noto Serif",
];

/// Genre keywords checked in order; the first match wins.
const FONT_RULES: &[(&[&str], [&str; 6])] = &[
    (
        &["fantasy"],
        [
            "Cinzel",
            "Almendra",
            "Uncial Antiqua",
            "Libre Baskerville",
            "Cormorant Garamond",
            "Crimson Text",
        ],
    ),
    (
        &["romance"],
        [
            "Dancing Script",
            "Great Vibes",
            "Playfair Display",
            "Lora",
            "Crimson Text",
            "Libre Baskerville",
        ],
    ),
    (
        &["sci", "cyberpunk"],
        [
            "Orbitron",
            "Exo",
            "Rajdhani",
            "Roboto",
            "Source Code Pro",
            "Titillium Web",
        ],
    ),
    (
        &["horror"],
        [
            "Creepster",
            "Nosifer",
            "Butcherman",
            "Crimson Text",
            "Libre Baskerville",
            "Cormorant Garamond",
        ],
    ),
    (
        &["mystery", "thriller"],
        [
            "Abril Fatface",
            "Playfair Display",
            "Crimson Text",
            "Libre Baskerville",
            "Lora",
            "Cormorant Garamond",
        ],
    ),
];

pub fn fallback_fonts(genre: &str) -> Vec<String> {
    let genres = genre.to_lowercase();
    let fonts = FONT_RULES
        .iter()
        .find(|(keywords, _)| keywords.iter().any(|keyword| genres.contains(keyword)))
        .map_or(&DEFAULT_FONTS, |(_, fonts)| fonts);
    fonts.iter().map(|font| font.to_string()).collect()
}

pub fn genre_guidance(genre: &str) -> &'static str {
    let genres = genre.to_lowercase();
    if genres.contains("fantasy") {
        "- Establish magic system rules and limitations early\n\
         - Build the world gradually through character experiences\n\
         - Include moments of wonder and discovery\n\
         - Balance action with character development"
    } else if genres.contains("romance") {
        "- Focus on emotional character development\n\
         - Build romantic tension gradually\n\
         - Include obstacles that test the relationship\n\
         - Ensure both characters have individual growth arcs"
    } else if genres.contains("mystery") || genres.contains("thriller") {
        "- Plant clues and red herrings strategically\n\
         - Maintain suspense through pacing\n\
         - Reveal information gradually to build tension\n\
         - Ensure fair play with readers regarding clues"
    } else {
        "- Focus on character-driven plot development\n\
         - Ensure themes are woven naturally into the story\n\
         - Balance dialogue, action, and description\n\
         - Maintain consistent tone throughout"
    }
}

const OUTLINE_STRUCTURE: &str = "\
ENHANCED STRUCTURE:

ACT I - SETUP (Chapters 1-3):
- Introduction of main character(s) and their ordinary world
- Establish the setting, tone, and initial conflict
- Inciting incident that propels the story forward
- Character's initial reaction and decision to act
- Introduction of key supporting characters

ACT II - CONFRONTATION (Chapters 4-8):
- Rising action with escalating challenges and obstacles
- Character development and relationship building
- Exploration of themes through character interactions
- Midpoint crisis that changes everything and raises stakes
- Obstacles that test the character's resolve and growth
- Darkest moment where all seems lost

ACT III - RESOLUTION (Chapters 9-12):
- Final confrontation with the main conflict
- Character uses lessons learned throughout the story
- Climax where the central problem is addressed
- Resolution that ties up loose ends and character arcs
- New equilibrium showing character growth and change

KEY PLOT POINTS TO DEVELOP:
1. Opening hook that immediately engages readers
2. Character motivation and stakes clearly established
3. Progressive complications that build tension
4. Emotional character arcs that resonate with themes
5. Satisfying conclusion that delivers on promises made

SUGGESTED CHAPTER BREAKDOWN:
- Each chapter should advance both plot and character development
- Include moments of conflict, revelation, and growth
- Balance action with character introspection and dialogue
- End chapters with hooks to maintain reader engagement
- Ensure each chapter serves the overall story arc";

/// Three-act expansion of the story's outline with genre guidance.
pub fn fallback_outline(story: &Story) -> String {
    format!(
        "ENHANCED STORY OUTLINE FOR \"{title}\"\n\n\
         GENRE: {genre}\n\
         SETTING: {setting}\n\
         THEME: {theme}\n\
         TARGET AUDIENCE: {audience}\n\n\
         ORIGINAL OUTLINE:\n{outline}\n\n\
         {structure}\n\n\
         GENRE-SPECIFIC CONSIDERATIONS:\n{guidance}\n\n\
         This enhanced outline provides a solid foundation for AI-assisted chapter generation \
         while maintaining the core elements of your original story concept.",
        title = story.title,
        genre = story.genre,
        setting = story.setting,
        theme = story.theme,
        audience = story.target_audience,
        outline = story.plot_outline,
        structure = OUTLINE_STRUCTURE,
        guidance = genre_guidance(&story.genre),
    )
}

struct Archetype {
    role: &'static str,
    description: &'static str,
    personality: &'static str,
    background: &'static str,
    goals: &'static str,
}

const PROTAGONIST: Archetype = Archetype {
    role: ROLE_PROTAGONIST,
    description: "A determined individual with sharp features and an analytical mind.",
    personality: "Intelligent and resourceful, natural leader with strong moral compass.",
    background: "Has overcome significant challenges in life, shaped by personal loss.",
    goals: "To solve the central mystery while protecting those they care about.",
};

const ANTAGONIST: Archetype = Archetype {
    role: ROLE_ANTAGONIST,
    description: "A formidable opponent with complex motivations.",
    personality: "Cunning and determined, believes their cause is just.",
    background: "Has their own tragic backstory that drives their actions.",
    goals: "To achieve their vision, regardless of the cost to others.",
};

const SUPPORTING: Archetype = Archetype {
    role: ROLE_SUPPORTING,
    description: "A loyal ally with unique skills and perspective.",
    personality: "Supportive and reliable, with their own interesting quirks.",
    background: "Has their own story arc that intersects with the main plot.",
    goals: "To support the protagonist while pursuing their own objectives.",
};

/// `count` characters (at least one): a protagonist, an antagonist when the
/// cast has more than two members, and supporting roles for the rest.
pub fn fallback_characters(count: usize, stamp: i64) -> Vec<Character> {
    let count = count.max(1);
    (0..count)
        .map(|index| {
            let archetype = match index {
                0 => &PROTAGONIST,
                1 if count > 2 => &ANTAGONIST,
                _ => &SUPPORTING,
            };
            Character {
                id: format!("fallback-{stamp}-{index}"),
                name: FALLBACK_NAMES[index % FALLBACK_NAMES.len()].to_string(),
                role: archetype.role.to_string(),
                description: archetype.description.to_string(),
                personality: archetype.personality.to_string(),
                background: archetype.background.to_string(),
                goals: archetype.goals.to_string(),
                relationships: String::new(),
            }
        })
        .collect()
}
