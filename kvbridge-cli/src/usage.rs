use libkvbridge::{CommandKind, Shape};

pub fn help() {
    let sections = vec![
        (
            "Shell",
            vec![
                ("HELP", "Display this usage information"),
                ("EXIT | QUIT", "End the session (or press `Esc`)"),
            ],
        ),
        (
            "Batches",
            vec![
                ("MULTI", "Queue the following commands as a transaction"),
                ("PIPELINE", "Queue the following commands as a pipeline"),
                ("EXEC", "Send the queued commands, all or nothing"),
                ("DISCARD", "Drop the queued commands"),
            ],
        ),
        (
            "Strings",
            vec![
                (
                    "SET <key> <value> [EX|PX|EXAT|PXAT n]",
                    "Set a value, optional expiry",
                ),
                ("  [NX|XX] [GET] [KEEPTTL] [IFEQ v]", "Set conditions"),
                ("GET <key>", "Get the value for a key"),
                ("GETEX <key> [EX n] [PERSIST]", "Get and change expiry"),
                ("MSET <key> <value> [key value ...]", "Set several keys"),
                ("MGET <key> [key ...]", "Get several keys"),
                ("INCR | DECR <key>", "Add or subtract 1"),
                ("GETRANGE <key> <start> <end>", "Substring of a value"),
            ],
        ),
        (
            "Keyspace",
            vec![
                ("DEL | EXISTS | TOUCH <key> [key ...]", "Work on several keys"),
                ("EXPIRE <key> <seconds> [NX|XX|GT|LT]", "Set a timeout"),
                ("TTL | PTTL <key>", "Remaining time to live"),
                ("TYPE <key>", "Type code of the stored value"),
                ("RENAME <key> <new_key>", "Rename a key"),
                ("SCAN <cursor> [MATCH p] [COUNT n] [TYPE t]", "Iterate the keyspace"),
                ("HSCAN | SSCAN | ZSCAN <key> <cursor> ...", "Iterate one collection"),
            ],
        ),
        (
            "Bits",
            vec![
                ("BITCOUNT <key> [start end [BIT|BYTE]]", "Count set bits"),
                ("BITPOS <key> <bit> [start end [BIT|BYTE]]", "Find a bit"),
                ("SETBIT | GETBIT <key> <offset> [bit]", "Write or read a bit"),
                ("BITOP <AND|OR|XOR|NOT> <dest> <key> ...", "Combine bitmaps"),
            ],
        ),
        (
            "Geo",
            vec![
                ("GEOADD <key> [NX|XX] [CH] lon lat member ...", "Add places"),
                ("GEODIST <key> <m1> <m2> [m|km|ft|mi]", "Distance between members"),
                ("GEOSEARCH <key> FROMMEMBER m | FROMLONLAT x y", "Search an area"),
                ("  BYRADIUS r unit | BYBOX w h unit", "Search area"),
                ("  [WITHCOORD] [WITHDIST] [WITHHASH]", "Reply extras"),
                ("  [COUNT n [ANY]] [ASC|DESC]", "Limit and order"),
                ("GEOSEARCHSTORE <dest> <src> ... [STOREDIST]", "Store a search"),
            ],
        ),
        (
            "Sorted sets",
            vec![
                ("ZADD <key> [XX|NX] [LT|GT] [CH] [INCR] score member ...", "Add members"),
                ("ZRANGE <key> <start> <stop> [BYSCORE|BYLEX]", "Read a range"),
                ("  [REV] [LIMIT offset count] [WITHSCORES]", "Range options"),
                ("ZUNIONSTORE <dest> <numkeys> <key> ...", "Union into dest"),
                ("  [WEIGHTS w ...] [AGGREGATE SUM|MIN|MAX]", "Store options"),
            ],
        ),
    ];

    println!("USAGE:\r\n");

    for (section, commands) in sections {
        println!("  {section}:\r");
        for (cmd, desc) in commands {
            println!("    {:<40} # {}\r", cmd, desc);
        }
        println!("\r");
    }

    let names: Vec<&str> = CommandKind::all()
        .filter(|kind| Shape::of(*kind).is_some())
        .map(|kind| kind.name())
        .collect();
    println!("  All commands:\r");
    for row in names.chunks(6) {
        println!("    {}\r", row.join(", "));
    }
    println!("\r");
}
