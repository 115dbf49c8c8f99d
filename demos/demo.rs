use sqlfly::*;

record! {
    #[derive(Debug, Clone)]
    pub struct User {
        pub id: i64,
        pub name: String,
        pub age: u32,
        #[hidden]
        pub password_hash: String,
        pub tags: Vec<String>,
    }
}

fn user(id: i64, name: &str, age: u32) -> User {
    User {
        id,
        name: name.into(),
        age,
        password_hash: format!("{:x}", id * 7919),
        tags: vec![],
    }
}

fn print_users<'a>(users: impl IntoIterator<Item = &'a User>) {
    println!("{:<5} {:<10} {:<5}", "ID", "NAME", "AGE");
    println!("{}", "-".repeat(25));
    for user in users {
        println!("{:<5} {:<10} {:<5}", user.id, user.name, user.age);
    }
    println!();
}

fn main() -> Result<(), Error> {
    println!("In-Memory Table Demo\n");

    // Create table of users, ids must be distinct
    let mut users = Table::<User>::new(&["id"])?;
    let columns: Vec<_> = users.schema().columns.iter().map(|c| c.name.as_str()).collect();
    println!("Created table of {} with columns {:?}", users.schema().record, columns);

    // Insert data
    println!("Inserting data...");
    users.insert(user(1, "Alice", 30))?;
    users.insert(user(2, "Bob", 17))?;
    users.insert(user(3, "Charlie", 25))?;
    println!("Inserted {} rows", users.count());

    if let Err(err) = users.insert(user(2, "Mallory", 40)) {
        println!("Rejected duplicate: {err}\n");
    }

    println!("All users:");
    print_users(&users);

    println!("Adults by age, oldest first:");
    print_users(users.select("age >= 18u", &[OrderBy::desc("age")], 0, None)?);

    let updated = users.update(&[Assignment::new("age", Value::Uint(18))], "name == \"Bob\"")?;
    println!("Updated {updated} row(s)");

    let removed = users.delete("name.startsWith(\"C\")")?;
    println!("Deleted {removed} row(s)\n");

    println!("Remaining users:");
    print_users(&users);

    if let Err(err) = users.select("password_hash == \"\"", &[], 0, None) {
        println!("Hidden fields cannot be queried: {err}");
    }

    Ok(())
}
