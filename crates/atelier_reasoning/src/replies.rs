//! Scripted persona replies, used by the canned responder and for photo results.

use atelier_core::{FilterSpec, FilterType, PersonaKey};
use atelier_perception::{Brightness, ColorVariety, SkinToneAnalysis, Undertone, WardrobeAnalysis};

/// A reply chosen when any keyword occurs in the lower-cased utterance.
struct Branch {
    any_of: &'static [&'static str],
    reply: &'static str,
}

const CHAT: &[Branch] = &[
    Branch {
        any_of: &["color", "analysis"],
        reply: "OMG yes! I'd love to help with your color analysis! 🌈✨ You should totally use the Analyze button to take a photo so I can see your gorgeous features and give you personalized color recs! 💅",
    },
    Branch {
        any_of: &["style"],
        reply: "Babe, you're asking the right questions! 💃 Tell me more about your vibe: are you feeling edgy, classic, boho, or something totally unique? I'm here to help you slay! ✨👑",
    },
    Branch {
        any_of: &["outfit"],
        reply: "Yasss, outfit planning is my jam! 🔥 What's the occasion? Date night? Work meeting? Casual hangout? Let's put together something that screams YOU! 💅✨",
    },
    Branch {
        any_of: &["trend"],
        reply: "Honey, the trends right now are SO good! 🎊 Think oversized blazers, statement accessories, and mixing textures! But remember, the best trend is confidence! 💃👑",
    },
    Branch {
        any_of: &["hello", "hi"],
        reply: "Hey gorgeous! 👋✨ I'm FASHIONISTA, your AI style bestie! Ready to make some fashion magic happen? What's on your mind today? 💅🎉",
    },
];

const CHAT_DEFAULT: &str = "Love that question! 💕 I'm here to chat about all things style! What specifically are you curious about? Colors, outfits, trends? Let's talk fashion! ✨👗";

const SKIN_TONE: &[Branch] = &[
    Branch {
        any_of: &["what", "colors", "good", "me"],
        reply: "OMG, I'm so excited to help you discover your best colors! 🎉 To give you the most amazing personalized advice, I need a little more information about you. 🌈\n\n\
1. **Skin Tone**: What is your natural skin color (fair, light, medium, tan, deep)? Do you burn easily, tan easily, or both?\n\
2. **Undertones**: What color are the veins on your wrist? (Blue/purple = cool, Green = warm, Blue-green = neutral) Does gold or silver jewelry look more flattering?\n\
3. **Hair & Eyes**: What is your natural hair color? What color are your eyes?\n\n\
Once I know your coloring, I can suggest colors that make you absolutely glow! ✨ Let's find your perfect palette! 🎨",
    },
    Branch {
        any_of: &["undertone", "veins", "wrist"],
        reply: "Great question about undertones! 💫 Look at the veins on your wrist in natural light. Blue or purple means cool undertones, green means warm, and blue-green means you might be neutral! 🌈\n\n\
Also hold gold and silver jewelry up to your face. Gold usually flatters warm undertones, while silver looks amazing on cool undertones! ✨",
    },
    Branch {
        any_of: &["season", "spring", "summer", "autumn", "winter"],
        reply: "Yasss, let's find your color season! 🎨 **Spring** = warm, bright, clear colors. **Summer** = cool, soft, muted colors. **Autumn** = warm, rich, earthy colors. **Winter** = cool, bold, clear colors. 🌈\n\n\
Which colors do people always compliment you in? Do you look better in bright or soft shades? Once we nail your season, I can give you the perfect palette! ✨",
    },
    Branch {
        any_of: &["makeup", "lipstick", "foundation"],
        reply: "Makeup colors are everything! 💄 Match your foundation to your undertone: yellow or golden for warm, pink or blue-based for cool, and neutrals can wear both! 🌟\n\n\
For lipstick, warm undertones rock coral, orange-red and warm pinks, while cool undertones slay in blue-reds, berry and cool pinks. Want help finding your perfect shade? 💋✨",
    },
];

const SKIN_TONE_DEFAULT: &str = "I'm your color analysis bestie! 🎨 Tell me more about your skin tone, undertones, or what specific colors you're curious about. I'm here to help you discover the colors that make you absolutely glow! ✨🌈";

const TAKE_PICTURE: &[Branch] = &[
    Branch {
        any_of: &["take", "picture", "photo", "camera"],
        reply: "Perfect! Let's capture that amazing shot! 📸✨ Find good natural lighting and stand back so I can see all your fabulous clothes clearly. Ready when you are, just tap the camera button! 📸🎉",
    },
    Branch {
        any_of: &["help", "how", "tips"],
        reply: "Here are my top photo tips! 📸 Use natural light near a window, step back so I can see your whole wardrobe, and make sure clothes aren't too cluttered together. The better the photo, the better my outfit suggestions! Ready to snap that perfect shot? 📸✨",
    },
    Branch {
        any_of: &["lighting", "light"],
        reply: "Great question about lighting! 💡 Natural light from a window is your best friend because it shows the true colors of your clothes. Avoid harsh overhead lights and dark corners, and let the light hit your wardrobe evenly. You've got this! 📸✨",
    },
];

const TAKE_PICTURE_DEFAULT: &str = "I'm here to help you take the perfect wardrobe photo! 📸 Just tell me when you're ready and I'll guide you through getting that amazing shot of your closet! 📸✨";

const WARDROBE: &[Branch] = &[
    Branch {
        any_of: &["analyze", "analysis", "wardrobe", "closet"],
        reply: "OMG, I'm so excited to dive into your wardrobe! 🎉👗 Here are my top suggestions:\n\n\
**Outfit 1**: Pair a light colored top with dark bottoms, classic and always chic! ✨\n\
**Outfit 2**: Look for pieces that layer, like cardigans over dresses or blouses.\n\
**Outfit 3**: Mix textures and colors, don't be afraid to combine different pieces!\n\n\
Snap a photo of your closet and I'll get specific. What occasion are you dressing for? 👗✨",
    },
    Branch {
        any_of: &["occasion", "work", "date", "casual", "formal"],
        reply: "Perfect! Let me tailor suggestions for your occasion! 🎯 For work: crisp blouses with tailored pants or skirts. For dates: something that makes you feel confident, maybe a dress with statement accessories! For casual: nice jeans with a cute top. What pieces are you working with? 👗✨",
    },
    Branch {
        any_of: &["colors", "color", "matching"],
        reply: "Great eye for color coordination! 🌈 Try grouping similar tones together, or create contrast with light and dark pieces. Neutrals like white, black and navy go with almost everything and make great foundation pieces! What's your favorite color combination? 🎨✨",
    },
    Branch {
        any_of: &["suggest", "recommend", "what", "wear"],
        reply: "Here's what I'd suggest! 👗 Pick one standout piece as your focal point, then build around it with complementary items. Mix casual and dressy elements for that effortless chic look! What's your style vibe today? ✨",
    },
];

const WARDROBE_DEFAULT: &str = "I'm your wardrobe analysis expert! 👗✨ I can help you discover amazing outfit combinations hiding in your closet! Tell me about specific occasions, color preferences, or style goals. Let's unlock your wardrobe's full potential! 🎉";

fn pick(branches: &[Branch], default: &'static str, utterance: &str) -> &'static str {
    let text = utterance.to_lowercase();
    branches
        .iter()
        .find(|b| b.any_of.iter().any(|w| text.contains(w)))
        .map(|b| b.reply)
        .unwrap_or(default)
}

/// Scripted reply for a text-only turn. Filter turns go through `filter_reply`.
pub fn canned_reply(persona: PersonaKey, utterance: &str) -> &'static str {
    match persona {
        PersonaKey::Chat => pick(CHAT, CHAT_DEFAULT, utterance),
        PersonaKey::SkinToneAnalysis => pick(SKIN_TONE, SKIN_TONE_DEFAULT, utterance),
        PersonaKey::TakePicture => pick(TAKE_PICTURE, TAKE_PICTURE_DEFAULT, utterance),
        PersonaKey::WardrobeAnalysis => pick(WARDROBE, WARDROBE_DEFAULT, utterance),
        PersonaKey::UpdateFilter => {
            "Tell me what you'd like to filter by: a material, a store, or sustainable pieces! 🛍️✨"
        }
    }
}

/// Confirmation for an extracted filter.
pub fn filter_reply(filter: &FilterSpec) -> String {
    match filter.filter_type {
        FilterType::Material => format!("Done! Showing you {} pieces only. 🧵✨", filter.value),
        FilterType::Store => format!("You got it! Here's everything from {}. 🛍️✨", filter.value),
        FilterType::Sustainable => {
            "Love that! Showing sustainable pieces only. 🌱✨".to_string()
        }
        FilterType::Unknown => canned_reply(PersonaKey::UpdateFilter, "").to_string(),
    }
}

pub fn skin_tone_reply(analysis: &SkinToneAnalysis) -> String {
    let rgb = analysis.average_rgb;
    let advice = match analysis.undertone {
        Undertone::Warm => {
            "You've got warm undertones! 🌞 Golds, corals, olive greens and warm browns will make you glow, and gold jewelry is your bestie."
        }
        Undertone::Cool => {
            "You've got cool undertones! ❄️ Jewel tones like sapphire, emerald and berry will make you shine, and silver jewelry is your match."
        }
        Undertone::Neutral => {
            "You've got neutral undertones, lucky you! 🌈 You can rock both warm and cool shades, and soft blush, jade and navy look amazing."
        }
    };
    format!(
        "{} (Average tone from your photo: {}, RGB {}, {}, {}.) Want outfit ideas in your best colors? ✨",
        advice,
        rgb.hex(),
        rgb.r,
        rgb.g,
        rgb.b
    )
}

pub fn wardrobe_reply(analysis: &WardrobeAnalysis) -> String {
    let variety = match analysis.color_variety {
        ColorVariety::Low => {
            "Your wardrobe has a tight, cohesive palette, perfect for easy mix-and-match capsule outfits."
        }
        ColorVariety::Medium => {
            "Your wardrobe has a nice balance of colors, so pair one statement shade with neutrals for polished looks."
        }
        ColorVariety::High => {
            "Your wardrobe is bursting with color! Try color blocking, or anchor one bold piece with a neutral."
        }
    };
    let brightness = match analysis.brightness {
        Brightness::Dark => "Lots of deep tones in there, so add a light top or accessory to lift an outfit.",
        Brightness::Medium => "The mid tones give you flexibility from day to evening.",
        Brightness::Bright => "So many light, bright pieces! Ground them with one darker layer for contrast.",
    };
    format!("Here's what I see in your closet! 👗 {} {} What occasion are you dressing for? ✨", variety, brightness)
}

/// Reply when a photo was attached but could not be analyzed.
pub fn analysis_failed_reply() -> &'static str {
    "I couldn't read that photo clearly! 📸 Please try again with better lighting and make sure the whole picture is in frame. ✨"
}
