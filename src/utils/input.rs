use std::io;
use std::io::Write;

pub fn input_trim(prompt: &str) -> io::Result<String> {
    print!("{}", prompt);
    io::stdout().flush()?; // show the prompt before blocking

    let mut input = String::new();
    io::stdin().read_line(&mut input)?;
    Ok(input.trim().to_string())
}

/// Reads a line without echoing it.
pub fn input_password_trim(prompt: &str) -> io::Result<String> {
    Ok(rpassword::prompt_password(prompt)?.trim().to_string())
}
