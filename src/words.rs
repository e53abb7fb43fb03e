// model = "claude-opus-4-5"
// created = "2026-10-18"
// modified = "2026-10-18"
// driver = "Isaac Clayton"

//! The word-code dictionary: 1024 words, sorted, so each word carries 10 bits.

pub(crate) const WORDS: [&str; 1024] = [
    "able", "acid", "acorn", "actor", "adapt", "admit", "adobe", "adult",
    "affair", "afford", "agent", "agile", "agree", "ahead", "aisle", "alarm",
    "album", "alert", "algae", "alien", "alley", "allow", "almond", "alpha",
    "altar", "amber", "amble", "amend", "amused", "anchor", "angel", "anger",
    "angle", "ankle", "annual", "answer", "antler", "anvil", "apart", "apple",
    "april", "apron", "arbor", "arcade", "arch", "arctic", "arena", "argue",
    "armor", "army", "aroma", "arrow", "artist", "ash", "aspen", "asset",
    "atlas", "atom", "attic", "audio", "august", "aunt", "autumn", "avenue",
    "awake", "award", "axis", "bacon", "badge", "bagel", "baker", "bakery",
    "bald", "ballad", "bamboo", "banana", "band", "banjo", "banner", "barley",
    "barn", "barrel", "basil", "basin", "basket", "batch", "bath", "beach",
    "beacon", "beam", "bean", "bear", "beard", "beaver", "beech", "beetle",
    "begin", "being", "bell", "belt", "bench", "berry", "bingo", "birch",
    "bird", "bison", "bitter", "blade", "blank", "blaze", "blend", "bless",
    "blimp", "blink", "bliss", "block", "bloom", "blue", "blunt", "blur",
    "board", "boat", "body", "bold", "bolt", "bonus", "book", "boost",
    "boot", "border", "bottle", "bounce", "bow", "bowl", "box", "brain",
    "branch", "brass", "brave", "bread", "breeze", "brick", "bridge", "brief",
    "bright", "brisk", "broad", "bronze", "brook", "broom", "brush", "bubble",
    "bucket", "buddy", "budget", "bugle", "build", "bulb", "bundle", "bunny",
    "burger", "burrow", "butter", "button", "buzz", "cabin", "cable", "cactus",
    "cadet", "cafe", "cage", "cake", "calm", "camel", "camera", "camp",
    "canal", "candle", "candy", "canoe", "canvas", "canyon", "cape", "carbon",
    "card", "cargo", "carpet", "carrot", "cart", "carve", "case", "castle",
    "catch", "cattle", "cave", "cedar", "celery", "cellar", "cement", "census",
    "cereal", "chalk", "change", "chapel", "charm", "chart", "chase", "cheek",
    "cheese", "chef", "cherry", "chess", "chest", "chief", "child", "chime",
    "choir", "chorus", "cider", "cinema", "circle", "circus", "city", "civic",
    "clam", "clap", "clay", "clean", "clerk", "clever", "cliff", "climb",
    "clinic", "clock", "cloud", "clover", "clown", "club", "coach", "coast",
    "cobalt", "cocoa", "code", "coffee", "coin", "comet", "comic", "common",
    "condor", "cookie", "copper", "coral", "cord", "corn", "corner", "cosmic",
    "cotton", "couch", "cousin", "cover", "coyote", "crab", "cradle", "craft",
    "crane", "crater", "crayon", "cream", "credit", "creek", "crew", "crisp",
    "crop", "crown", "crumb", "cube", "cuddle", "curve", "custom", "cycle",
    "daisy", "dance", "dandy", "dash", "dawn", "deck", "decoy", "deer",
    "delta", "denim", "depot", "desert", "design", "desk", "detail", "dial",
    "diary", "diesel", "digit", "dinner", "dipper", "direct", "disco", "dish",
    "divide", "dock", "doctor", "domain", "donkey", "donut", "door", "dove",
    "dragon", "drama", "draw", "dream", "dress", "drift", "drill", "drink",
    "drum", "duck", "dune", "dusk", "dust", "eager", "eagle", "early",
    "earth", "easel", "east", "easy", "echo", "edge", "effort", "eight",
    "elbow", "elder", "elite", "elk", "elm", "ember", "empire", "empty",
    "enamel", "energy", "engine", "enjoy", "enter", "entry", "envoy", "equal",
    "equip", "erode", "errand", "escape", "essay", "estate", "ether", "event",
    "exact", "exhale", "exile", "exit", "expert", "extra", "fable", "fabric",
    "face", "factor", "fair", "fairy", "faith", "falcon", "fall", "family",
    "famous", "fancy", "fang", "farm", "fast", "father", "fauna", "feast",
    "fence", "fern", "ferry", "fever", "fiber", "fiddle", "field", "fiesta",
    "figure", "film", "filter", "final", "finch", "finger", "fire", "first",
    "fish", "flag", "flame", "flash", "flask", "fleet", "flight", "flint",
    "float", "flock", "floor", "flora", "flour", "flower", "fluent", "flurry",
    "flute", "focus", "fog", "foil", "folk", "forest", "forge", "fork",
    "fort", "fossil", "fox", "frame", "fresh", "friend", "frog", "frost",
    "fruit", "fudge", "fuel", "funnel", "fury", "future", "gadget", "galaxy",
    "game", "garage", "garden", "garlic", "garnet", "gate", "gauge", "gecko",
    "gem", "genius", "gentle", "geyser", "ghost", "giant", "gift", "ginger",
    "glad", "glass", "glide", "globe", "glory", "glove", "glow", "goat",
    "gold", "golf", "good", "goose", "gospel", "gourd", "grace", "grain",
    "grand", "grape", "graph", "grass", "gravel", "great", "greatness", "green",
    "grid", "grill", "grin", "grove", "growth", "guard", "guest", "guide",
    "guitar", "gulf", "gull", "gust", "habit", "hammer", "hand", "harbor",
    "harp", "hat", "haven", "hawk", "hazel", "head", "heart", "hearth",
    "heat", "hedge", "helmet", "herb", "hero", "heron", "hill", "hint",
    "hobby", "hockey", "hold", "hollow", "holly", "home", "honey", "hood",
    "hope", "horn", "horse", "hotel", "hound", "house", "hover", "humble",
    "hummus", "hunt", "hurry", "husky", "hybrid", "icicle", "icon", "idea",
    "igloo", "image", "impact", "inch", "index", "indigo", "infant", "inlet",
    "input", "insect", "island", "ivory", "ivy", "jacket", "jade", "jaguar",
    "jam", "jar", "jazz", "jeans", "jelly", "jersey", "jewel", "jigsaw",
    "jockey", "jolly", "joy", "judge", "juice", "jumbo", "jungle", "junior",
    "jury", "kayak", "keen", "kernel", "kettle", "key", "kid", "kind",
    "king", "kiosk", "kite", "kitten", "kiwi", "knee", "knight", "knob",
    "koala", "label", "lace", "ladder", "lady", "lagoon", "lake", "lamb",
    "lamp", "lance", "laptop", "large", "lark", "laser", "latch", "laugh",
    "lava", "lawn", "layer", "leaf", "ledge", "legend", "lemon", "lens",
    "letter", "level", "lilac", "lily", "lime", "linen", "lion", "liquid",
    "list", "lizard", "llama", "lobby", "local", "locket", "lodge", "logic",
    "lotus", "loud", "lounge", "love", "loyal", "lucky", "lumber", "lunar",
    "lunch", "lute", "lyric", "magic", "magnet", "major", "mango", "manor",
    "maple", "marble", "march", "margin", "marine", "market", "marsh", "mask",
    "mason", "matrix", "meadow", "medal", "melody", "melon", "memo", "mentor",
    "menu", "merit", "mesa", "metal", "meteor", "method", "metro", "middle",
    "mild", "mill", "mimic", "mind", "minor", "mint", "minute", "mirror",
    "mist", "mitten", "mixer", "model", "modem", "modest", "molten", "moment",
    "monkey", "moon", "moose", "mosaic", "moss", "motel", "mother", "motor",
    "mouse", "mural", "muse", "museum", "music", "myth", "napkin", "narrow",
    "nation", "native", "nature", "navy", "nectar", "needle", "neon", "nest",
    "never", "new", "nickel", "night", "ninja", "noble", "noodle", "normal",
    "north", "notch", "note", "novel", "nugget", "number", "nurse", "nutmeg",
    "oak", "oasis", "oat", "ocean", "octave", "office", "olive", "omega",
    "onion", "opal", "open", "opera", "orange", "orbit", "orchid", "organ",
    "origin", "otter", "outer", "oval", "oven", "owl", "oxygen", "oyster",
    "pace", "paddle", "page", "palace", "palm", "panda", "panel", "paper",
    "parade", "parcel", "park", "parrot", "party", "pasta", "pastel", "patch",
    "path", "patrol", "pause", "peach", "peak", "peanut", "pear", "pebble",
    "pecan", "pencil", "pepper", "perch", "person", "pet", "petal", "phone",
    "photo", "piano", "picnic", "pier", "pigeon", "pillow", "pilot", "pine",
    "pineapple", "pink", "pipe", "pirate", "pitch", "pixel", "pizza", "plain",
    "planet", "plank", "plant", "plate", "plaza", "pledge", "plum", "plume",
    "pocket", "poem", "poet", "polar", "polka", "pond", "pony", "poppy",
    "porch", "portal", "poster", "potato", "powder", "praise", "prism", "prize",
    "proud", "puffin", "pulse", "punch", "pupil", "puppy", "purple", "puzzle",
    "quail", "quarry", "quartz", "queen", "quest", "quick", "quiet", "quill",
    "quilt", "quiver", "rabbit", "radar", "radio", "raft", "rain", "raisin",
    "rally", "ranch", "random", "ranger", "rapid", "raven", "razor", "ready",
    "realm", "reason", "reef", "relay", "relic", "rice", "ridge", "rifle",
    "ring", "river", "road", "robin", "robot", "rodeo", "roof", "room",
    "root", "rope", "rose", "rover", "royal", "ruby", "rug", "ruler",
    "rumor", "saga", "sail", "salad", "salsa", "salt", "sand", "satin",
    "sauce", "savvy", "scale", "scarf", "scene", "scout", "seed", "sense",
    "shark", "shelf", "shell", "shine", "ship", "shore", "silk", "siren",
    "ski", "sky", "slate", "sled", "slope", "smile", "snack", "snail",
    "snow", "soap", "sofa", "soft", "solar", "solid", "sonic", "soup",
    "south", "spark", "spice", "spoon", "sport", "squid", "staff", "stage",
    "stamp", "star", "steam", "steel", "stem", "stick", "still", "stone",
    "storm", "story", "stove", "straw", "sugar", "suit", "sun", "super",
    "surf", "swamp", "swan", "sweet", "swift", "swing", "syrup", "table",
    "taco", "tango", "tank", "taxi", "tea", "team", "tent", "tide",
    "tiger", "tiny", "toast", "token", "tonic", "topaz", "torch", "totem",
    "tower", "town", "toy", "track", "trade", "trail", "train", "tray",
    "tree", "tribe", "trick", "trout", "truck", "trunk", "tulip", "tuna",
    "tutor", "twig", "twin", "uncle", "union", "unit", "upper", "urban",
    "valve", "vapor", "vault", "venus", "verse", "vest", "vine", "vinyl",
    "visa", "visit", "vista", "vital", "vivid", "voice", "wagon", "warm",
    "wave", "wedge", "whale", "wheat", "wheel", "wind", "wolf", "wood",
    "wool", "world", "wrist", "yacht", "yard", "yarn", "year", "yeti",
    "young", "yummy", "zebra", "zero", "zest", "zinc", "zone", "zoo",
];
